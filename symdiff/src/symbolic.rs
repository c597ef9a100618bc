//! Derivatives as new expressions.
//!
//! [`Expr::symbolic_derivative`] appends a fresh sub-graph computing
//! `∂self/∂var` and returns its root. Existing nodes are reused as
//! operands but never changed. Operands that do not depend on `var`
//! contribute nothing, so their branch of each rule is dropped rather
//! than multiplied by a constant zero.

use std::collections::HashMap;

use crate::error::{DiffError, Result};
use crate::feed::Feed;
use crate::graph::{BinaryOp, Expr, Graph, NodeId, NodeKind, UnaryOp};

impl Expr {
    /// `∂self/∂var` as an expression in the same graph.
    ///
    /// Returns a constant zero when `self` does not depend on `var`.
    ///
    /// ```
    /// use symdiff::{Feed, Graph};
    ///
    /// let g = Graph::new();
    /// let x = g.variable("x");
    /// let f = x.powf(4.0);
    /// let d2 = f.symbolic_derivative(&x).symbolic_derivative(&x);
    ///
    /// let at2 = Feed::new().bind(&x, 2.0);
    /// assert_eq!(d2.evaluate(&at2).unwrap().scalar(), Some(48.0));
    /// ```
    pub fn symbolic_derivative(&self, var: &Expr) -> Expr {
        let graph = self.graph();
        if !graph.same(var.graph()) {
            return graph.constant(0.0);
        }
        let wrt = var.id();
        log::debug!("symbolic derivative of {} wrt {}", self.id(), wrt);
        let arena = graph.arena();
        let order = arena.schedule(self.id(), |n| !arena.node(n).deps.contains(&wrt));
        drop(arena);
        // Local to this call: repeated calls build fresh sub-graphs.
        let mut derived: HashMap<NodeId, Expr> = HashMap::new();
        for n in order {
            let d = derive(graph, n, &derived);
            log::trace!("d{n} = {d}");
            derived.insert(n, d);
        }
        derived
            .remove(&self.id())
            .unwrap_or_else(|| graph.constant(0.0))
    }

    /// The `order`-th derivative with respect to the only free variable.
    ///
    /// Order zero returns the expression itself. An expression without
    /// variables differentiates to a constant zero.
    pub fn symbolic_derivative_n(&self, order: usize) -> Result<Expr> {
        match self.dependent_variables().as_slice() {
            _ if order == 0 => Ok(self.clone()),
            [] => Ok(self.graph().constant(0.0)),
            [x] => Ok((0..order).fold(self.clone(), |f, _| f.symbolic_derivative(x))),
            many => Err(DiffError::MultipleVariables(many.len())),
        }
    }
}

/// Derivative of one node, given the derivatives of its operands.
///
/// An operand missing from `derived` does not depend on the variable.
fn derive(graph: &Graph, id: NodeId, derived: &HashMap<NodeId, Expr>) -> Expr {
    let d = |n: NodeId| derived.get(&n).cloned();
    match graph.node(id).kind {
        // only the variable itself is ever scheduled
        NodeKind::Variable { .. } => graph.constant(1.0),
        NodeKind::Constant(_) => graph.constant(0.0),
        NodeKind::Unary(op, a) => match d(a) {
            Some(du) => chain(op, &graph.expr(a), &graph.expr(id), du),
            None => graph.constant(0.0),
        },
        NodeKind::Binary(op, a, b) => combine(
            op,
            &graph.expr(a),
            &graph.expr(b),
            &graph.expr(id),
            d(a),
            d(b),
        ),
    }
}

/// `φ′(u)·du` where `h = φ(u)` is the node itself.
fn chain(op: UnaryOp, u: &Expr, h: &Expr, du: Expr) -> Expr {
    let slope = match op {
        UnaryOp::Neg => return -du,
        UnaryOp::Ln => return du / u,
        UnaryOp::LogBase(b) => return du / (u * b.ln()),
        UnaryOp::Powf(p) if p == 0.0 => return u.graph().constant(0.0),
        UnaryOp::Sin => u.cos(),
        UnaryOp::Cos => -u.sin(),
        UnaryOp::Tan => 1.0 + h.powf(2.0),
        UnaryOp::Sinh => u.cosh(),
        UnaryOp::Cosh => u.sinh(),
        UnaryOp::Tanh => 1.0 - h.powf(2.0),
        UnaryOp::Exp => h.clone(),
        UnaryOp::Powf(p) => p * u.powf(p - 1.0),
        UnaryOp::Asin => (1.0 - u.powf(2.0)).powf(-0.5),
        UnaryOp::Acos => -(1.0 - u.powf(2.0)).powf(-0.5),
        UnaryOp::Atan => 1.0 / (1.0 + u.powf(2.0)),
        UnaryOp::Logistic => h * (1.0 - h),
        UnaryOp::Sqrt => 0.5 / h,
    };
    slope * du
}

/// The exponent's value when it is a plain number fixed by constants.
fn fixed_exponent(g: &Expr) -> Option<f64> {
    g.evaluate(&Feed::new()).ok()?.scalar()
}

/// Sum, product, quotient and power rules for `h = f ∘ g`.
fn combine(op: BinaryOp, f: &Expr, g: &Expr, h: &Expr, df: Option<Expr>, dg: Option<Expr>) -> Expr {
    match (op, df, dg) {
        (_, None, None) => f.graph().constant(0.0),
        (BinaryOp::Add, Some(df), Some(dg)) => df + dg,
        (BinaryOp::Add | BinaryOp::Sub, Some(df), None) => df,
        (BinaryOp::Add, None, Some(dg)) => dg,
        (BinaryOp::Sub, Some(df), Some(dg)) => df - dg,
        (BinaryOp::Sub, None, Some(dg)) => -dg,
        (BinaryOp::Mul, Some(df), Some(dg)) => df * g + f * dg,
        (BinaryOp::Mul, Some(df), None) => df * g,
        (BinaryOp::Mul, None, Some(dg)) => f * dg,
        (BinaryOp::Div, Some(df), Some(dg)) => df / g - f * dg / (g * g),
        (BinaryOp::Div, Some(df), None) => df / g,
        (BinaryOp::Div, None, Some(dg)) => -(f * dg) / (g * g),
        (BinaryOp::Pow, Some(df), Some(dg)) => g * f.pow(g - 1.0) * df + f.ln() * h * dg,
        (BinaryOp::Pow, Some(df), None) => match fixed_exponent(g) {
            Some(p) => chain(UnaryOp::Powf(p), f, h, df),
            None => g * f.pow(g - 1.0) * df,
        },
        (BinaryOp::Pow, None, Some(dg)) => f.ln() * h * dg,
    }
}
