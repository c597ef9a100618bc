//! First derivatives: every partial of a node in one sweep.
//!
//! Each node gets a sparse map `variable → ∂node/∂variable` whose keys
//! are exactly the node's dependent variables. Maps are built bottom-up
//! from the operands' maps with the usual rules; the sum and difference
//! rules are the group operations of [`SparseSum`].

use std::collections::HashMap;
use std::rc::Rc;

use algebra_core::{Group, Semigroup, SparseSum};

use crate::error::Result;
use crate::eval::Pass;
use crate::feed::Feed;
use crate::graph::{BinaryOp, Expr, Graph, NodeId, NodeKind, UnaryOp};
use crate::value::Value;

pub(crate) type Partials = SparseSum<NodeId, Value>;

/// All first partials of an expression at one point.
///
/// Variables the expression does not depend on read as zero through
/// [`Gradient::wrt`].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    partials: Partials,
    variables: Vec<Expr>,
}

impl Gradient {
    /// `∂f/∂var`, zero when `f` does not depend on `var`.
    pub fn wrt(&self, var: &Expr) -> Value {
        self.get(var).cloned().unwrap_or_default()
    }

    /// The stored partial for `var`, if `f` depends on it.
    pub fn get(&self, var: &Expr) -> Option<&Value> {
        // ids alone are ambiguous across graphs
        if !self.variables.contains(var) {
            return None;
        }
        self.partials.get(&var.id())
    }

    /// The partial for the first variable called `name`.
    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.variables
            .iter()
            .find(|v| v.name().as_deref() == Some(name))
            .and_then(|v| self.get(v))
    }

    /// The variables with an entry, in creation order.
    pub fn variables(&self) -> &[Expr] {
        &self.variables
    }

    /// `(variable, partial)` pairs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&Expr, &Value)> {
        self.variables
            .iter()
            .filter_map(|v| self.partials.get(&v.id()).map(|d| (v, d)))
    }

    /// Number of variables with an entry.
    pub fn len(&self) -> usize {
        self.partials.len()
    }

    /// True for an expression without variables.
    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// The underlying sparse map keyed by node id.
    pub fn as_sparse(&self) -> &SparseSum<NodeId, Value> {
        &self.partials
    }
}

/// Result of [`Expr::derivative`].
#[derive(Debug, Clone, PartialEq)]
pub enum Derivative {
    /// The expression has no variables.
    Zero,
    /// The expression has exactly one variable; this is its derivative.
    Single(Value),
    /// One partial per variable.
    Partials(Gradient),
}

impl Derivative {
    /// The derivative as a plain number, when that is what it is.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Derivative::Zero => Some(0.0),
            Derivative::Single(v) => v.scalar(),
            Derivative::Partials(_) => None,
        }
    }

    /// The table of partials, when there are at least two variables.
    pub fn partials(&self) -> Option<&Gradient> {
        match self {
            Derivative::Partials(g) => Some(g),
            _ => None,
        }
    }
}

pub(crate) struct GradPass<'a> {
    pub(crate) eval: Pass<'a>,
    partials: HashMap<NodeId, Rc<Partials>>,
}

impl<'a> GradPass<'a> {
    pub(crate) fn new(graph: &'a Graph, feed: &'a Feed) -> Self {
        Self {
            eval: Pass::new(graph, feed),
            partials: HashMap::new(),
        }
    }

    pub(crate) fn partials(&mut self, id: NodeId) -> Result<Rc<Partials>> {
        if let Some(d) = self.partials.get(&id) {
            return Ok(d.clone());
        }
        self.eval.value(id)?;
        for n in self.eval.schedule(id, |n| self.partials.contains_key(&n)) {
            let d = self.compute(n)?;
            log::trace!("partials {n}: {} entries", d.len());
            self.partials.insert(n, Rc::new(d));
        }
        Ok(self.partials[&id].clone())
    }

    /// Partials of a node already produced by [`GradPass::partials`].
    pub(crate) fn cached(&self, id: NodeId) -> &Partials {
        &self.partials[&id]
    }

    fn compute(&self, id: NodeId) -> Result<Partials> {
        let d = match &self.eval.arena.node(id).kind {
            NodeKind::Variable { .. } => [(id, Value::Scalar(1.0))].into_iter().collect(),
            NodeKind::Constant(_) => Partials::new(),
            NodeKind::Unary(UnaryOp::Neg, a) => self.cached(*a).inverse(),
            NodeKind::Unary(op, a) => {
                let slope = self.eval.cached(*a).map(|x| op.first(x));
                self.cached(*a).map_values(|d| d * &slope)
            }
            NodeKind::Binary(op, a, b) => {
                let (da, db) = (self.cached(*a), self.cached(*b));
                let (f, g) = (self.eval.cached(*a), self.eval.cached(*b));
                match op {
                    BinaryOp::Add => da.combine(db),
                    BinaryOp::Sub => da.combine(&db.inverse()),
                    BinaryOp::Mul => da
                        .map_values(|d| d * g)
                        .combine(&db.map_values(|d| d * f)),
                    BinaryOp::Div => {
                        let g2 = g * g;
                        da.map_values(|d| d / g)
                            .combine(&db.map_values(|d| -(d * f) / &g2))
                    }
                    BinaryOp::Pow => power_partials(f, g, da, db)?,
                }
            }
        };
        Ok(d)
    }
}

/// `∂(f^g) = g·f^(g-1)·∂f + f^g·ln f·∂g`; the second term only when `g`
/// has variables, and then `f` must be positive.
fn power_partials(f: &Value, g: &Value, df: &Partials, dg: &Partials) -> Result<Partials> {
    let mut d = Partials::new();
    if !df.is_empty() {
        let slope = g.zip_with(f, |p, x| UnaryOp::Powf(p).first(x));
        d = df.map_values(|x| x * &slope);
    }
    if !dg.is_empty() {
        f.ensure("pow", |x| x > 0.0)?;
        let slope = f.powv(g) * f.ln();
        d = d.combine(&dg.map_values(|x| x * &slope));
    }
    Ok(d)
}

impl Expr {
    /// Every first partial of the expression at the point given by `feed`.
    pub fn gradient(&self, feed: &Feed) -> Result<Gradient> {
        let variables = self.dependent_variables();
        log::debug!("gradient {} over {} variables", self.id(), variables.len());
        let mut pass = GradPass::new(self.graph(), feed);
        let partials = pass.partials(self.id())?;
        Ok(Gradient {
            partials: (*partials).clone(),
            variables,
        })
    }

    /// `∂self/∂var` at the point given by `feed`.
    pub fn partial(&self, feed: &Feed, var: &Expr) -> Result<Value> {
        Ok(self.gradient(feed)?.wrt(var))
    }

    /// First derivative, collapsed by the number of variables.
    ///
    /// An expression without variables gives [`Derivative::Zero`], one
    /// with a single variable gives its derivative unwrapped, anything
    /// else the full [`Gradient`].
    ///
    /// ```
    /// use symdiff::{Derivative, Feed, Graph};
    ///
    /// let g = Graph::new();
    /// let x = g.variable("x");
    /// let y = x.powf(3.0);
    /// let d = y.derivative(&Feed::new().bind(&x, 10.0)).unwrap();
    /// assert_eq!(d.scalar(), Some(300.0));
    ///
    /// let (a, b) = (g.variable("a"), g.variable("b"));
    /// let feed = Feed::new().bind(&a, 100.0).bind(&b, 2.0);
    /// match (&a - &b).derivative(&feed).unwrap() {
    ///     Derivative::Partials(grad) => {
    ///         assert_eq!(grad.wrt(&a).scalar(), Some(1.0));
    ///         assert_eq!(grad.wrt(&b).scalar(), Some(-1.0));
    ///     }
    ///     other => panic!("expected partials, got {other:?}"),
    /// }
    /// ```
    pub fn derivative(&self, feed: &Feed) -> Result<Derivative> {
        let grad = self.gradient(feed)?;
        Ok(match grad.len() {
            0 => Derivative::Zero,
            1 => Derivative::Single(grad.partials.into_iter().map(|(_, v)| v).sum()),
            _ => Derivative::Partials(grad),
        })
    }
}
