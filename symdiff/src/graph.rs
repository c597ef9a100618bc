//! The expression graph: an append-only arena of immutable nodes.
//!
//! A [`Graph`] owns every node; an [`Expr`] is a cheap handle (graph +
//! [`NodeId`]) to one of them. Operator overloading on handles appends
//! new nodes and never touches existing ones, so the same sub-expression
//! can be shared by any number of parents:
//!
//! ```
//! use symdiff::{Feed, Graph};
//!
//! let g = Graph::new();
//! let x = g.variable("x");
//! let s = x.sin();            // one node ...
//! let f = &s * &s + &s;       // ... referenced three times
//!
//! let v = f.evaluate(&Feed::new().bind(&x, 1.0)).unwrap();
//! let s1 = 1.0_f64.sin();
//! assert_eq!(v.scalar(), Some(s1 * s1 + s1));
//! ```
//!
//! Every node records the set of variables reachable from it. The set
//! is computed once, when the node is appended, by joining the sets of
//! its operands.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use algebra_core::{BoundedJoinSemilattice, JoinSemilattice};
use ndarray::Array1;

use crate::error::Result;
use crate::value::Value;

/// Stable handle of a node inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Distinguishes graphs; node ids restart at zero in every graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct GraphId(u64);

impl GraphId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        GraphId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Single-operand operators.
///
/// Each operator knows its value and its first and second derivative
/// as plain functions of the operand value. The numeric engines combine
/// these with the chain rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// `-u`
    Neg,
    /// `sin u`
    Sin,
    /// `cos u`
    Cos,
    /// `tan u`
    Tan,
    /// `sinh u`
    Sinh,
    /// `cosh u`
    Cosh,
    /// `tanh u`
    Tanh,
    /// `e^u`
    Exp,
    /// `ln u`
    Ln,
    /// `u^p` for a fixed exponent `p`
    Powf(f64),
    /// `asin u`
    Asin,
    /// `acos u`
    Acos,
    /// `atan u`
    Atan,
    /// `1 / (1 + e^-u)`
    Logistic,
    /// `√u`
    Sqrt,
    /// `log_b u` for a fixed base `b`
    LogBase(f64),
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl UnaryOp {
    /// Short lowercase name, used in error messages and display.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
            UnaryOp::Powf(_) => "powf",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Logistic => "logistic",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::LogBase(_) => "log",
        }
    }

    /// `φ(x)`
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
            UnaryOp::Sinh => x.sinh(),
            UnaryOp::Cosh => x.cosh(),
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => x.ln(),
            UnaryOp::Powf(p) => x.powf(p),
            UnaryOp::Asin => x.asin(),
            UnaryOp::Acos => x.acos(),
            UnaryOp::Atan => x.atan(),
            UnaryOp::Logistic => logistic(x),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::LogBase(b) => x.ln() / b.ln(),
        }
    }

    /// `φ′(x)`
    pub fn first(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -1.0,
            UnaryOp::Sin => x.cos(),
            UnaryOp::Cos => -x.sin(),
            UnaryOp::Tan => {
                let t = x.tan();
                1.0 + t * t
            }
            UnaryOp::Sinh => x.cosh(),
            UnaryOp::Cosh => x.sinh(),
            UnaryOp::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => 1.0 / x,
            UnaryOp::Powf(p) if p == 0.0 => 0.0,
            UnaryOp::Powf(p) => p * x.powf(p - 1.0),
            UnaryOp::Asin => 1.0 / (1.0 - x * x).sqrt(),
            UnaryOp::Acos => -1.0 / (1.0 - x * x).sqrt(),
            UnaryOp::Atan => 1.0 / (1.0 + x * x),
            UnaryOp::Logistic => {
                let s = logistic(x);
                s * (1.0 - s)
            }
            UnaryOp::Sqrt => 0.5 / x.sqrt(),
            UnaryOp::LogBase(b) => 1.0 / (x * b.ln()),
        }
    }

    /// `φ″(x)`
    pub fn second(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => 0.0,
            UnaryOp::Sin => -x.sin(),
            UnaryOp::Cos => -x.cos(),
            UnaryOp::Tan => {
                let t = x.tan();
                2.0 * t * (1.0 + t * t)
            }
            UnaryOp::Sinh => x.sinh(),
            UnaryOp::Cosh => x.cosh(),
            UnaryOp::Tanh => {
                let t = x.tanh();
                -2.0 * t * (1.0 - t * t)
            }
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => -1.0 / (x * x),
            UnaryOp::Powf(p) if p == 0.0 || p == 1.0 => 0.0,
            UnaryOp::Powf(p) => p * (p - 1.0) * x.powf(p - 2.0),
            UnaryOp::Asin => x / (1.0 - x * x).powf(1.5),
            UnaryOp::Acos => -x / (1.0 - x * x).powf(1.5),
            UnaryOp::Atan => -2.0 * x / (1.0 + x * x).powi(2),
            UnaryOp::Logistic => {
                let s = logistic(x);
                s * (1.0 - s) * (1.0 - 2.0 * s)
            }
            UnaryOp::Sqrt => -0.25 / x.powf(1.5),
            UnaryOp::LogBase(b) => -1.0 / (x * x * b.ln()),
        }
    }

    /// Reject operand values outside the operator's real domain.
    pub fn check_domain(self, operand: &Value) -> Result<()> {
        match self {
            UnaryOp::Ln | UnaryOp::LogBase(_) => operand.ensure(self.name(), |x| x > 0.0),
            UnaryOp::Sqrt => operand.ensure("sqrt", |x| x >= 0.0),
            UnaryOp::Asin | UnaryOp::Acos => {
                operand.ensure(self.name(), |x| (-1.0..=1.0).contains(&x))
            }
            UnaryOp::Powf(p) if p.fract() != 0.0 => operand.ensure("powf", |x| x >= 0.0),
            _ => Ok(()),
        }
    }

    /// `φ` applied elementwise, after the domain check.
    pub fn eval(self, operand: &Value) -> Result<Value> {
        self.check_domain(operand)?;
        Ok(operand.map(|x| self.apply(x)))
    }
}

/// Two-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a^b` where `b` may itself be an expression
    Pow,
}

impl BinaryOp {
    /// Infix symbol used by the `Display` impl of [`Expr`].
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Variable { name: Option<String> },
    Constant(Value),
    Unary(UnaryOp, NodeId),
    Binary(BinaryOp, NodeId, NodeId),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) requires_grad: bool,
    pub(crate) deps: Rc<BTreeSet<NodeId>>,
}

/// Storage behind a [`Graph`]. Nodes are appended and never modified.
#[derive(Debug)]
pub(crate) struct Arena {
    graph: GraphId,
    nodes: Vec<Node>,
}

impl Arena {
    fn new() -> Self {
        Self {
            graph: GraphId::fresh(),
            nodes: Vec::new(),
        }
    }

    pub(crate) fn graph_id(&self) -> GraphId {
        self.graph
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Nodes reachable from `root` without passing through a node for
    /// which `done` holds, in topological order.
    ///
    /// Operands are always pushed before their users, so ascending id
    /// order is topological.
    pub(crate) fn schedule(&self, root: NodeId, done: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if done(id) || !seen.insert(id) {
                continue;
            }
            match self.node(id).kind {
                NodeKind::Unary(_, a) => stack.push(a),
                NodeKind::Binary(_, a, b) => {
                    stack.push(a);
                    stack.push(b);
                }
                NodeKind::Variable { .. } | NodeKind::Constant(_) => {}
            }
        }
        seen.into_iter().collect()
    }

    fn push(&mut self, kind: NodeKind, requires_grad: bool) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let deps = match &kind {
            NodeKind::Variable { .. } => Rc::new(BTreeSet::from([id])),
            NodeKind::Constant(_) => Rc::new(BTreeSet::bottom()),
            NodeKind::Unary(_, a) => self.node(*a).deps.clone(),
            NodeKind::Binary(_, a, b) => {
                let (l, r) = (&self.node(*a).deps, &self.node(*b).deps);
                if r.leq(l) {
                    l.clone()
                } else if l.leq(r) {
                    r.clone()
                } else {
                    Rc::new(l.join(r))
                }
            }
        };
        self.nodes.push(Node {
            kind,
            requires_grad,
            deps,
        });
        id
    }
}

/// A shared, append-only arena of expression nodes.
///
/// Cloning a `Graph` clones the handle, not the nodes.
#[derive(Clone)]
pub struct Graph {
    arena: Rc<RefCell<Arena>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::new())),
        }
    }
}

impl Graph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// A named variable that takes part in differentiation.
    ///
    /// Two variables are distinct nodes even if they share a name.
    pub fn variable(&self, name: impl Into<String>) -> Expr {
        let name: String = name.into();
        self.variable_with_grad((!name.is_empty()).then_some(name), true)
    }

    /// An unnamed variable; it can only be bound by identity.
    pub fn anonymous(&self) -> Expr {
        self.variable_with_grad(None, true)
    }

    /// A variable with an explicit `requires_grad` flag.
    pub fn variable_with_grad(&self, name: Option<String>, requires_grad: bool) -> Expr {
        self.push(NodeKind::Variable { name }, requires_grad)
    }

    /// A constant leaf.
    pub fn constant(&self, value: impl Into<Value>) -> Expr {
        self.constant_with_grad(value, false)
    }

    /// A constant leaf with an explicit `requires_grad` flag.
    pub fn constant_with_grad(&self, value: impl Into<Value>, requires_grad: bool) -> Expr {
        self.push(NodeKind::Constant(value.into()), requires_grad)
    }

    /// Number of nodes appended so far.
    pub fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    /// True when no node has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn arena(&self) -> Ref<'_, Arena> {
        self.arena.borrow()
    }

    pub(crate) fn node(&self, id: NodeId) -> Node {
        self.arena.borrow().node(id).clone()
    }

    pub(crate) fn expr(&self, id: NodeId) -> Expr {
        Expr {
            graph: self.clone(),
            id,
        }
    }

    pub(crate) fn push(&self, kind: NodeKind, requires_grad: bool) -> Expr {
        let id = self.arena.borrow_mut().push(kind, requires_grad);
        self.expr(id)
    }

    pub(crate) fn same(&self, other: &Graph) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("nodes", &self.len()).finish()
    }
}

/// Either an existing node or a raw number to be promoted to a constant.
#[derive(Debug, Clone)]
pub enum Operand {
    /// An expression already in the graph.
    Node(Expr),
    /// A literal; becomes a [`Graph::constant`] node on use.
    Literal(Value),
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Operand::Node(e)
    }
}

impl From<&Expr> for Operand {
    fn from(e: &Expr) -> Self {
        Operand::Node(e.clone())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Literal(v)
    }
}

impl From<f64> for Operand {
    fn from(x: f64) -> Self {
        Operand::Literal(Value::Scalar(x))
    }
}

impl From<i32> for Operand {
    fn from(x: i32) -> Self {
        Operand::Literal(Value::from(x))
    }
}

impl From<Vec<f64>> for Operand {
    fn from(v: Vec<f64>) -> Self {
        Operand::Literal(Value::from(v))
    }
}

impl From<Array1<f64>> for Operand {
    fn from(a: Array1<f64>) -> Self {
        Operand::Literal(Value::Array(a))
    }
}

/// Handle to a node of a [`Graph`].
///
/// Equality is identity: two handles are equal when they refer to the
/// same node of the same graph.
#[derive(Clone)]
pub struct Expr {
    graph: Graph,
    id: NodeId,
}

impl Expr {
    /// The node this handle refers to.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The graph holding the node.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn node(&self) -> Node {
        self.graph.node(self.id)
    }

    /// Identity across graphs.
    pub(crate) fn key(&self) -> (GraphId, NodeId) {
        (self.graph.arena().graph_id(), self.id)
    }

    /// The variable's name; `None` for anonymous variables and other nodes.
    pub fn name(&self) -> Option<String> {
        match self.node().kind {
            NodeKind::Variable { name } => name,
            _ => None,
        }
    }

    /// Advisory flag; never affects computed values.
    pub fn requires_grad(&self) -> bool {
        self.graph.arena().node(self.id).requires_grad
    }

    /// True for variable leaves.
    pub fn is_variable(&self) -> bool {
        matches!(
            self.graph.arena().node(self.id).kind,
            NodeKind::Variable { .. }
        )
    }

    /// True for constant leaves.
    pub fn is_constant(&self) -> bool {
        matches!(self.graph.arena().node(self.id).kind, NodeKind::Constant(_))
    }

    /// The variables reachable from this node, in creation order.
    pub fn dependent_variables(&self) -> Vec<Expr> {
        self.dep_ids()
            .iter()
            .map(|&id| self.graph.expr(id))
            .collect()
    }

    pub(crate) fn dep_ids(&self) -> Rc<BTreeSet<NodeId>> {
        self.graph.arena().node(self.id).deps.clone()
    }

    /// Apply a single-operand operator.
    pub fn unary(&self, op: UnaryOp) -> Expr {
        let requires_grad = self.requires_grad();
        self.graph
            .push(NodeKind::Unary(op, self.id), requires_grad)
    }

    /// Apply a two-operand operator; a literal `rhs` becomes a constant.
    ///
    /// # Panics
    ///
    /// Panics if `rhs` is an expression from a different graph.
    pub fn binary(&self, op: BinaryOp, rhs: impl Into<Operand>) -> Expr {
        let (rhs, requires_grad) = match rhs.into() {
            Operand::Node(rhs) => {
                assert!(
                    self.graph.same(&rhs.graph),
                    "expressions must share a graph"
                );
                let right = rhs.requires_grad();
                let left = self.requires_grad();
                (rhs.id, left && right)
            }
            Operand::Literal(v) => (self.graph.constant(v).id, self.requires_grad()),
        };
        self.graph
            .push(NodeKind::Binary(op, self.id, rhs), requires_grad)
    }

    fn literal_lhs(lhs: Value, op: BinaryOp, rhs: &Expr) -> Expr {
        let lhs = rhs.graph.constant(lhs);
        rhs.graph
            .push(NodeKind::Binary(op, lhs.id, rhs.id), rhs.requires_grad())
    }

    /// `self^exponent`, where the exponent may be an expression.
    pub fn pow(&self, exponent: impl Into<Operand>) -> Expr {
        self.binary(BinaryOp::Pow, exponent)
    }

    /// `self^p` for a fixed exponent.
    pub fn powf(&self, p: f64) -> Expr {
        self.unary(UnaryOp::Powf(p))
    }

    /// `sin(self)`
    pub fn sin(&self) -> Expr {
        self.unary(UnaryOp::Sin)
    }

    /// `cos(self)`
    pub fn cos(&self) -> Expr {
        self.unary(UnaryOp::Cos)
    }

    /// `tan(self)`
    pub fn tan(&self) -> Expr {
        self.unary(UnaryOp::Tan)
    }

    /// `sinh(self)`
    pub fn sinh(&self) -> Expr {
        self.unary(UnaryOp::Sinh)
    }

    /// `cosh(self)`
    pub fn cosh(&self) -> Expr {
        self.unary(UnaryOp::Cosh)
    }

    /// `tanh(self)`
    pub fn tanh(&self) -> Expr {
        self.unary(UnaryOp::Tanh)
    }

    /// `e^self`
    pub fn exp(&self) -> Expr {
        self.unary(UnaryOp::Exp)
    }

    /// `ln(self)`
    pub fn ln(&self) -> Expr {
        self.unary(UnaryOp::Ln)
    }

    /// `asin(self)`
    pub fn asin(&self) -> Expr {
        self.unary(UnaryOp::Asin)
    }

    /// `acos(self)`
    pub fn acos(&self) -> Expr {
        self.unary(UnaryOp::Acos)
    }

    /// `atan(self)`
    pub fn atan(&self) -> Expr {
        self.unary(UnaryOp::Atan)
    }

    /// `1 / (1 + e^-self)`
    pub fn logistic(&self) -> Expr {
        self.unary(UnaryOp::Logistic)
    }

    /// `√self`
    pub fn sqrt(&self) -> Expr {
        self.unary(UnaryOp::Sqrt)
    }

    /// `log_base(self)`
    pub fn log_base(&self, base: f64) -> Expr {
        self.unary(UnaryOp::LogBase(base))
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.graph.same(&other.graph)
    }
}

impl Eq for Expr {}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({}: {})", self.id, self)
    }
}

fn write_node(arena: &Arena, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &arena.node(id).kind {
        NodeKind::Variable { name: Some(name) } => write!(f, "{name}"),
        NodeKind::Variable { name: None } => write!(f, "Var"),
        NodeKind::Constant(v) => write!(f, "{v}"),
        NodeKind::Unary(UnaryOp::Neg, a) => {
            write!(f, "-(")?;
            write_node(arena, *a, f)?;
            write!(f, ")")
        }
        NodeKind::Unary(UnaryOp::Powf(p), a) => {
            write!(f, "(")?;
            write_node(arena, *a, f)?;
            write!(f, ")^{p}")
        }
        NodeKind::Unary(UnaryOp::LogBase(b), a) => {
            write!(f, "log{b}(")?;
            write_node(arena, *a, f)?;
            write!(f, ")")
        }
        NodeKind::Unary(op, a) => {
            write!(f, "{}(", op.name())?;
            write_node(arena, *a, f)?;
            write!(f, ")")
        }
        NodeKind::Binary(op, a, b) => {
            write!(f, "(")?;
            write_node(arena, *a, f)?;
            write!(f, " {} ", op.symbol())?;
            write_node(arena, *b, f)?;
            write!(f, ")")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(&self.graph.arena(), self.id, f)
    }
}

macro_rules! impl_expr_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Operand>> $trait<R> for Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                self.binary($op, rhs)
            }
        }

        impl<R: Into<Operand>> $trait<R> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                self.binary($op, rhs)
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::literal_lhs(Value::Scalar(self), $op, &rhs)
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::literal_lhs(Value::Scalar(self), $op, rhs)
            }
        }

        impl $trait<Expr> for i32 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::literal_lhs(Value::from(self), $op, &rhs)
            }
        }

        impl $trait<&Expr> for i32 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::literal_lhs(Value::from(self), $op, rhs)
            }
        }
    };
}

impl_expr_binop!(Add, add, BinaryOp::Add);
impl_expr_binop!(Sub, sub, BinaryOp::Sub);
impl_expr_binop!(Mul, mul, BinaryOp::Mul);
impl_expr_binop!(Div, div, BinaryOp::Div);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}
