//! Variable bindings.

use std::collections::HashMap;

use crate::error::{DiffError, Result};
use crate::graph::{Expr, GraphId, NodeId};
use crate::value::Value;

/// Values for the variables of an expression.
///
/// A variable is looked up by identity first, then by name, so
///
/// ```
/// use symdiff::{Feed, Graph};
///
/// let g = Graph::new();
/// let x = g.variable("x");
/// let f = &x * 2.0;
///
/// let by_handle = Feed::new().bind(&x, 3.0);
/// let by_name = Feed::new().bind_name("x", 3.0);
/// assert_eq!(f.evaluate(&by_handle).unwrap(), f.evaluate(&by_name).unwrap());
/// ```
///
/// Anonymous variables can only be bound by handle. A handle binding
/// only ever applies to that variable of that graph.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    by_id: HashMap<(GraphId, NodeId), Value>,
    by_name: HashMap<String, Value>,
}

impl Feed {
    /// An empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the variable `var` to `value`.
    pub fn bind(mut self, var: &Expr, value: impl Into<Value>) -> Self {
        self.insert(var, value);
        self
    }

    /// Bind every variable called `name` to `value`.
    pub fn bind_name(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.by_name.insert(name.into(), value.into());
        self
    }

    /// In-place form of [`Feed::bind`].
    pub fn insert(&mut self, var: &Expr, value: impl Into<Value>) {
        self.by_id.insert(var.key(), value.into());
    }

    /// Number of bindings of either kind.
    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_name.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn lookup(&self, key: (GraphId, NodeId), name: Option<&str>) -> Result<&Value> {
        self.by_id
            .get(&key)
            .or_else(|| name.and_then(|n| self.by_name.get(n)))
            .ok_or_else(|| {
                DiffError::UnboundVariable(match name {
                    Some(n) => n.to_owned(),
                    None => format!("Var{}", key.1),
                })
            })
    }
}

impl<'a, V: Into<Value>> FromIterator<(&'a Expr, V)> for Feed {
    fn from_iter<I: IntoIterator<Item = (&'a Expr, V)>>(iter: I) -> Self {
        let mut feed = Feed::new();
        for (var, value) in iter {
            feed.insert(var, value);
        }
        feed
    }
}
