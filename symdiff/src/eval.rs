//! Numeric evaluation and the per-call pass shared by all engines.
//!
//! A [`Pass`] collects the nodes reachable from a root in topological
//! order and sweeps them once, the same way a reverse-mode tape is
//! replayed. Every node is computed at most once per pass no matter how
//! many parents share it.

use std::cell::Ref;
use std::collections::HashMap;

use crate::error::Result;
use crate::feed::Feed;
use crate::graph::{Arena, BinaryOp, Expr, Graph, NodeId, NodeKind};
use crate::value::Value;

/// Transient state of one top-level call.
///
/// Holds a shared borrow of the arena for its whole lifetime; the
/// graph cannot grow while a pass is alive.
pub(crate) struct Pass<'a> {
    pub(crate) arena: Ref<'a, Arena>,
    feed: &'a Feed,
    values: HashMap<NodeId, Value>,
}

impl<'a> Pass<'a> {
    pub(crate) fn new(graph: &'a Graph, feed: &'a Feed) -> Self {
        Self {
            arena: graph.arena(),
            feed,
            values: HashMap::new(),
        }
    }

    /// Nodes below `root` still missing from a cache, operands first.
    pub(crate) fn schedule(&self, root: NodeId, done: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        self.arena.schedule(root, done)
    }

    /// The value of `id`, computing it and everything below it on demand.
    pub(crate) fn value(&mut self, id: NodeId) -> Result<&Value> {
        if !self.values.contains_key(&id) {
            for n in self.schedule(id, |n| self.values.contains_key(&n)) {
                let v = self.compute(n)?;
                log::trace!("value {n} = {v}");
                self.values.insert(n, v);
            }
        }
        Ok(&self.values[&id])
    }

    /// Value of a node already produced by [`Pass::value`].
    ///
    /// # Panics
    ///
    /// Panics if the node was not evaluated in this pass.
    pub(crate) fn cached(&self, id: NodeId) -> &Value {
        &self.values[&id]
    }

    fn compute(&self, id: NodeId) -> Result<Value> {
        match &self.arena.node(id).kind {
            NodeKind::Variable { name } => {
                let key = (self.arena.graph_id(), id);
                self.feed.lookup(key, name.as_deref()).cloned()
            }
            NodeKind::Constant(v) => Ok(v.clone()),
            NodeKind::Unary(op, a) => op.eval(self.cached(*a)),
            NodeKind::Binary(op, a, b) => {
                let (l, r) = (self.cached(*a), self.cached(*b));
                Value::broadcast_len(l, r)?;
                Ok(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Pow => {
                        l.ensure_with(r, "pow", |base, e| base >= 0.0 || e.fract() == 0.0)?;
                        l.powv(r)
                    }
                })
            }
        }
    }
}

impl Expr {
    /// Evaluate the expression with the variables bound by `feed`.
    ///
    /// Variables are resolved by identity first, then by name:
    ///
    /// ```
    /// use symdiff::{DiffError, Feed, Graph};
    ///
    /// let g = Graph::new();
    /// let x = g.variable("x");
    /// let y = x.powf(3.0);
    /// assert_eq!(y.evaluate(&Feed::new().bind(&x, 10.0)).unwrap().scalar(), Some(1000.0));
    ///
    /// let unbound = y.evaluate(&Feed::new().bind_name("y", 1.0));
    /// assert_eq!(unbound, Err(DiffError::UnboundVariable("x".into())));
    /// ```
    pub fn evaluate(&self, feed: &Feed) -> Result<Value> {
        log::debug!("evaluate {}", self.id());
        let mut pass = Pass::new(self.graph(), feed);
        pass.value(self.id()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffError;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn eval1(f: &Expr, x: &Expr, at: f64) -> f64 {
        f.evaluate(&Feed::new().bind(x, at))
            .unwrap()
            .scalar()
            .unwrap()
    }

    #[test]
    fn cube() {
        let g = Graph::new();
        let x = g.variable("x");
        assert_eq!(eval1(&x.powf(3.0), &x, 10.0), 1000.0);
        assert_eq!(eval1(&x.pow(3.0), &x, 10.0), 1000.0);
    }

    #[test]
    fn constant_needs_no_bindings() {
        let g = Graph::new();
        assert_eq!(
            g.constant(5.0).evaluate(&Feed::new()),
            Ok(Value::Scalar(5.0))
        );
    }

    #[test]
    fn unbound_variable_fails() {
        let g = Graph::new();
        let x = g.variable("x");
        let _y = g.variable("y");
        let err = x.evaluate(&Feed::new().bind_name("y", 1.0));
        assert_eq!(err, Err(DiffError::UnboundVariable("x".into())));
    }

    #[test]
    fn trig_and_hyperbolic_values() {
        let g = Graph::new();
        let x = g.variable("x");
        assert_relative_eq!(eval1(&x.sin(), &x, FRAC_PI_2), 1.0);
        assert_relative_eq!(eval1(&x.cos(), &x, FRAC_PI_4), FRAC_PI_4.cos());
        assert_relative_eq!(eval1(&x.tan(), &x, FRAC_PI_4), 1.0, epsilon = 1e-12);
        assert_relative_eq!(eval1(&x.sinh(), &x, 1.0), 1.0_f64.sinh());
        assert_relative_eq!(eval1(&x.cosh(), &x, 1.0), 1.0_f64.cosh());
        assert_relative_eq!(eval1(&x.tanh(), &x, 1.0), 1.0_f64.tanh());
        assert_relative_eq!(eval1(&x.exp(), &x, 1.0), std::f64::consts::E);
    }

    #[test]
    fn logistic_and_log_base() {
        let g = Graph::new();
        let x = g.variable("x");
        assert_eq!(eval1(&x.logistic(), &x, 0.0), 0.5);
        assert_relative_eq!(eval1(&x.log_base(10.0), &x, 2.0), 0.30102999566398114);
    }

    #[test]
    fn shared_subexpression_matches_tree() {
        let g = Graph::new();
        let x = g.variable("x");
        let s = (&x * 3.0).exp();
        let dag = &s * &s - &s;
        let tree = (&x * 3.0).exp() * (&x * 3.0).exp() - (&x * 3.0).exp();
        assert_eq!(eval1(&dag, &x, 0.7), eval1(&tree, &x, 0.7));
    }

    #[test]
    fn each_node_is_computed_once() {
        let g = Graph::new();
        let x = g.variable("x");
        let s = x.sin();
        let f = &s + &s;
        let feed = Feed::new().bind(&x, 1.0);
        let mut pass = Pass::new(&g, &feed);
        let order = pass.schedule(f.id(), |_| false);
        assert_eq!(order, vec![x.id(), s.id(), f.id()]);
        pass.value(f.id()).unwrap();
        assert!(pass.schedule(f.id(), |n| pass.values.contains_key(&n)).is_empty());
    }

    #[test]
    fn vector_constants_add_elementwise() {
        let g = Graph::new();
        let a = g.constant(vec![1.0, 2.0, 3.0]);
        let b = g.constant(vec![10.0, 20.0, 30.0]);
        assert_eq!(
            (&a + &b).evaluate(&Feed::new()),
            Ok(Value::from(vec![11.0, 22.0, 33.0]))
        );
    }

    #[test]
    fn scalar_variable_broadcasts_over_vector_binding() {
        let g = Graph::new();
        let x = g.variable("x");
        let f = &x * &x + 1.0;
        let v = f.evaluate(&Feed::new().bind(&x, vec![1.0, 2.0])).unwrap();
        assert_eq!(v, Value::from(vec![2.0, 5.0]));
    }

    #[test]
    fn incompatible_arrays_are_an_error() {
        let g = Graph::new();
        let (x, y) = (g.variable("x"), g.variable("y"));
        let feed = Feed::new().bind(&x, vec![1.0, 2.0]).bind(&y, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            (&x + &y).evaluate(&feed),
            Err(DiffError::ShapeMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn domain_errors_surface() {
        let g = Graph::new();
        let x = g.variable("x");
        let feed = Feed::new().bind(&x, -1.0);
        assert!(matches!(x.ln().evaluate(&feed), Err(DiffError::Domain { op: "ln", .. })));
        assert!(matches!(x.sqrt().evaluate(&feed), Err(DiffError::Domain { .. })));
        assert!(matches!(x.pow(0.5).evaluate(&feed), Err(DiffError::Domain { op: "pow", .. })));
        assert_eq!(x.pow(2.0).evaluate(&feed), Ok(Value::Scalar(1.0)));
    }

    #[test]
    fn division_by_zero_is_ieee() {
        let g = Graph::new();
        let x = g.variable("x");
        let v = (1.0 / &x).evaluate(&Feed::new().bind(&x, 0.0)).unwrap();
        assert_eq!(v.scalar(), Some(f64::INFINITY));
    }
}
