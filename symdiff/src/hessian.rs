//! Second partial derivatives.
//!
//! Each node gets a sparse table `(x, y) → ∂²node/∂x∂y`, built from the
//! operands' values, first partials and tables. Every single-operand
//! operator uses the same rule
//!
//! ```text
//! ∂²φ(u)/∂x∂y = φ″(u)·u_x·u_y + φ′(u)·u_xy
//! ```
//!
//! with the closed forms of [`UnaryOp::first`] and [`UnaryOp::second`].

use std::collections::HashMap;
use std::rc::Rc;

use algebra_core::{Group, Semigroup, SparseSum};
use ndarray::Array2;

use crate::error::{DiffError, Result};
use crate::feed::Feed;
use crate::grad::{GradPass, Partials};
use crate::graph::{BinaryOp, Expr, Graph, NodeId, NodeKind, UnaryOp};
use crate::value::Value;

type Table = SparseSum<NodeId, SparseSum<NodeId, Value>>;

/// `a_x·b_y`
fn outer(a: &Partials, b: &Partials) -> Table {
    a.iter()
        .map(|(&x, ax)| (x, b.map_values(|by| ax * by)))
        .collect()
}

/// `a_x·b_y + a_y·b_x`
fn cross(a: &Partials, b: &Partials) -> Table {
    outer(a, b).combine(&outer(b, a))
}

fn scaled(t: &Table, k: &Value) -> Table {
    t.map_values(|row| row.map_values(|v| v * k))
}

/// All second partials of an expression at one point, over its
/// dependent variables.
///
/// ```
/// use symdiff::{Feed, Graph};
///
/// let g = Graph::new();
/// let (x, y) = (g.variable("x"), g.variable("y"));
/// let f = 3.0 * &x * &x * &y;
///
/// let h = f.hessian_table(&Feed::new().bind(&x, 1.0).bind(&y, 2.0)).unwrap();
/// assert_eq!(h.get(&x, &x).scalar(), Some(12.0));
/// assert_eq!(h.get(&x, &y).scalar(), Some(6.0));
/// assert_eq!(h.get(&y, &y).scalar(), Some(0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Hessian {
    variables: Vec<Expr>,
    table: Table,
}

impl Hessian {
    /// `∂²f/∂a∂b`; zero when `f` does not depend on `a` or `b`.
    pub fn get(&self, a: &Expr, b: &Expr) -> Value {
        if !(self.variables.contains(a) && self.variables.contains(b)) {
            return Value::default();
        }
        self.table
            .get(&a.id())
            .map(|row| row.get_or_empty(&b.id()))
            .unwrap_or_default()
    }

    /// `∂²f/∂a∂v` for every variable `v`, in [`Hessian::variables`] order.
    pub fn row(&self, a: &Expr) -> Vec<Value> {
        self.variables.iter().map(|b| self.get(a, b)).collect()
    }

    /// The expression's variables, in creation order.
    pub fn variables(&self) -> &[Expr] {
        &self.variables
    }

    /// Every `(a, b, ∂²f/∂a∂b)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (&Expr, &Expr, Value)> + '_ {
        self.variables.iter().flat_map(move |a| {
            self.variables
                .iter()
                .map(move |b| (a, b, self.get(a, b)))
        })
    }

    /// Whether `H[a][b]` and `H[b][a]` agree within `tol` everywhere.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.iter()
            .all(|(a, b, v)| v.approx_eq(&self.get(b, a), tol))
    }

    /// The table as a dense matrix; fails for array-valued entries.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let n = self.variables.len();
        let mut out = Array2::zeros((n, n));
        for (i, a) in self.variables.iter().enumerate() {
            for (j, b) in self.variables.iter().enumerate() {
                out[[i, j]] = self.get(a, b).as_scalar()?;
            }
        }
        Ok(out)
    }
}

/// Result of [`Expr::hessian`].
#[derive(Debug, Clone, PartialEq)]
pub enum SecondDerivative {
    /// The expression has no variables.
    Zero,
    /// The expression has one variable; this is `f″`.
    Single(Value),
    /// The full table.
    Table(Hessian),
}

impl SecondDerivative {
    /// The second derivative as a plain number, when that is what it is.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            SecondDerivative::Zero => Some(0.0),
            SecondDerivative::Single(v) => v.scalar(),
            SecondDerivative::Table(_) => None,
        }
    }
}

struct HessianPass<'a> {
    grad: GradPass<'a>,
    tables: HashMap<NodeId, Rc<Table>>,
}

impl<'a> HessianPass<'a> {
    fn new(graph: &'a Graph, feed: &'a Feed) -> Self {
        Self {
            grad: GradPass::new(graph, feed),
            tables: HashMap::new(),
        }
    }

    fn table(&mut self, id: NodeId) -> Result<Rc<Table>> {
        if let Some(t) = self.tables.get(&id) {
            return Ok(t.clone());
        }
        self.grad.partials(id)?;
        for n in self.grad.eval.schedule(id, |n| self.tables.contains_key(&n)) {
            let t = self.compute(n)?;
            log::trace!("hessian {n}: {} rows", t.len());
            self.tables.insert(n, Rc::new(t));
        }
        Ok(self.tables[&id].clone())
    }

    fn cached(&self, id: NodeId) -> &Table {
        &self.tables[&id]
    }

    fn compute(&self, id: NodeId) -> Result<Table> {
        let eval = &self.grad.eval;
        let t = match &eval.arena.node(id).kind {
            NodeKind::Variable { .. } | NodeKind::Constant(_) => Table::new(),
            NodeKind::Unary(UnaryOp::Neg, a) => self.cached(*a).inverse(),
            NodeKind::Unary(op, a) => {
                let v = eval.cached(*a);
                let du = self.grad.cached(*a);
                let curvature = v.map(|x| op.second(x));
                let slope = v.map(|x| op.first(x));
                scaled(&outer(du, du), &curvature).combine(&scaled(self.cached(*a), &slope))
            }
            NodeKind::Binary(op, a, b) => {
                let (f, g) = (eval.cached(*a), eval.cached(*b));
                let (df, dg) = (self.grad.cached(*a), self.grad.cached(*b));
                let (hf, hg) = (self.cached(*a), self.cached(*b));
                match op {
                    BinaryOp::Add => hf.combine(hg),
                    BinaryOp::Sub => hf.combine(&hg.inverse()),
                    BinaryOp::Mul => cross(df, dg)
                        .combine(&scaled(hg, f))
                        .combine(&scaled(hf, g)),
                    BinaryOp::Div => {
                        let g2 = g * g;
                        let g3 = &g2 * g;
                        scaled(&cross(df, dg), &-(1.0 / &g2))
                            .combine(&scaled(&outer(dg, dg), &(2.0 * f / &g3)))
                            .combine(&scaled(hf, &(1.0 / g)))
                            .combine(&scaled(hg, &-(f / &g2)))
                    }
                    BinaryOp::Pow => {
                        if !dg.is_empty() {
                            return Err(DiffError::Unsupported(
                                "second derivative of a power with a variable exponent",
                            ));
                        }
                        let curvature = g.zip_with(f, |p, x| UnaryOp::Powf(p).second(x));
                        let slope = g.zip_with(f, |p, x| UnaryOp::Powf(p).first(x));
                        scaled(&outer(df, df), &curvature).combine(&scaled(hf, &slope))
                    }
                }
            }
        };
        Ok(t)
    }
}

impl Expr {
    /// Every second partial at the point given by `feed`, as a table
    /// over [`Expr::dependent_variables`].
    pub fn hessian_table(&self, feed: &Feed) -> Result<Hessian> {
        let variables = self.dependent_variables();
        log::debug!("hessian {} over {} variables", self.id(), variables.len());
        let mut pass = HessianPass::new(self.graph(), feed);
        let sparse = pass.table(self.id())?;

        let mut table = Table::new();
        for a in &variables {
            let row = sparse.get(&a.id());
            let dense = variables
                .iter()
                .map(|b| {
                    let v = row.map(|r| r.get_or_empty(&b.id())).unwrap_or_default();
                    (b.id(), v)
                })
                .collect();
            table.insert(a.id(), dense);
        }
        Ok(Hessian { variables, table })
    }

    /// Second derivative, collapsed by the number of variables.
    ///
    /// ```
    /// use symdiff::{Feed, Graph};
    ///
    /// let g = Graph::new();
    /// let x = g.variable("x");
    /// let f = &x * &x * &x * 5.0 - 6.0 * &x;
    /// let h = f.hessian(&Feed::new().bind(&x, 1.0)).unwrap();
    /// assert_eq!(h.scalar(), Some(30.0));
    /// ```
    pub fn hessian(&self, feed: &Feed) -> Result<SecondDerivative> {
        let h = self.hessian_table(feed)?;
        Ok(match h.variables.len() {
            0 => SecondDerivative::Zero,
            1 => {
                let x = &h.variables[0];
                SecondDerivative::Single(h.get(x, x))
            }
            _ => SecondDerivative::Table(h),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scalar(h: &Hessian, a: &Expr, b: &Expr) -> f64 {
        h.get(a, b).as_scalar().unwrap()
    }

    fn check(h: &Hessian, vars: [&Expr; 3], expected: [f64; 6]) {
        let [x, y, z] = vars;
        let pairs = [(x, x), (y, y), (z, z), (x, y), (y, z), (x, z)];
        for ((a, b), want) in pairs.into_iter().zip(expected) {
            assert_abs_diff_eq!(scalar(h, a, b), want, epsilon = 1e-9);
            assert_abs_diff_eq!(scalar(h, b, a), want, epsilon = 1e-9);
        }
    }

    fn xyz(g: &Graph) -> (Expr, Expr, Expr) {
        (g.variable("x"), g.variable("y"), g.variable("z"))
    }

    fn at(vars: [&Expr; 3], p: [f64; 3]) -> Feed {
        vars.into_iter().zip(p).collect()
    }

    #[test]
    fn constants_have_zero_hessian() {
        let g = Graph::new();
        assert_eq!(g.constant(5.1231).hessian(&Feed::new()), Ok(SecondDerivative::Zero));
        let (c1, c2, c3) = (g.constant(50.0), g.constant(123.0), g.constant(500.0));
        let f = &c1 * &c2 + &c1 / &c3 + (1.0 - &c2) * (-&c3);
        assert_eq!(f.hessian(&Feed::new()), Ok(SecondDerivative::Zero));
    }

    #[test]
    fn single_variable_polynomials() {
        let g = Graph::new();
        let x = g.variable("x");
        let f = &x * &x * &x * 5.0 + 5.0 * (-&x) - &x - &x / 5.0;
        assert_eq!(f.hessian(&Feed::new().bind(&x, 0.0)).unwrap().scalar(), Some(0.0));
        assert_eq!(f.hessian(&Feed::new().bind(&x, 1.0)).unwrap().scalar(), Some(30.0));

        let r = 1.0 / (&x + 1.0) + 5.0 - 2.0 * &x;
        let h1 = r.hessian(&Feed::new().bind(&x, 1.0)).unwrap().scalar().unwrap();
        let h0 = r.hessian(&Feed::new().bind(&x, 0.0)).unwrap().scalar().unwrap();
        assert_abs_diff_eq!(h1, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(h0, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn single_variable_trig() {
        let g = Graph::new();
        let x = g.variable("x");
        let u = 5.0 * &x + 3.0;
        let (s, c) = (u.sin(), u.cos());
        for p in [1.0, 2.0, 3.0] {
            let feed = Feed::new().bind(&x, p);
            let arg = 5.0 * p + 3.0;
            let hs = s.hessian(&feed).unwrap().scalar().unwrap();
            let hc = c.hessian(&feed).unwrap().scalar().unwrap();
            assert_abs_diff_eq!(hs, -25.0 * arg.sin(), epsilon = 1e-9);
            assert_abs_diff_eq!(hc, -25.0 * arg.cos(), epsilon = 1e-9);
        }
    }

    #[test]
    fn arithmetic_tables() {
        let g = Graph::new();
        let (x, y, z) = xyz(&g);
        let vars = [&x, &y, &z];

        let f = 3.0 * &x * &x * &y + (&z - 1.0 / &x).pow(5.0);
        let h = f.hessian_table(&at(vars, [1.0, 2.0, 3.0])).unwrap();
        check(&h, vars, [12.0, 0.0, 160.0, 6.0, 0.0, 160.0]);

        let f = -&x * (&x - &y + 1.0).pow(-4.0) + (&z / &x).pow(2.0);
        let h = f.hessian_table(&at(vars, [1.0, 3.0, 5.0])).unwrap();
        check(&h, vars, [122.0, -20.0, 2.0, 24.0, 0.0, -20.0]);
    }

    #[test]
    fn trig_tables() {
        let g = Graph::new();
        let (x, y, z) = xyz(&g);
        let vars = [&x, &y, &z];

        let f = (&x * &y).sin() + &z * (&z * (1.0 / &z).tan()).cos();
        let h = f.hessian_table(&at(vars, [1.0, 3.0, 5.0])).unwrap();
        check(
            &h,
            vars,
            [
                -1.27008007253881,
                -0.141120008059867,
                -0.00505938378730904,
                -1.41335252078005,
                0.0,
                0.0,
            ],
        );

        let f = (&x * &y).sinh() + (&x + &y) * z.powf(2.0) * (&z * (1.0 / &z).tanh()).cosh();
        let h = f.hessian_table(&at(vars, [1.0, 2.0, 3.0])).unwrap();
        check(
            &h,
            vars,
            [
                14.5074416313881,
                3.62686040784702,
                9.30222790930887,
                11.0159165067777,
                9.24262429120983,
                9.24262429120983,
            ],
        );
    }

    #[test]
    fn log_exp_table() {
        let g = Graph::new();
        let (x, y, z) = xyz(&g);
        let vars = [&x, &y, &z];
        let f = ((&x - 3.0).exp() * &y).sinh() + (&y + x.pow(2.0)).ln() * &z * x.sin();
        let h = f.hessian_table(&at(vars, [1.0, 3.0, 5.0])).unwrap();
        check(
            &h,
            vars,
            [
                -1.57057071432359,
                -0.255317436069005,
                0.0,
                0.319028994080832,
                0.210367746201974,
                1.16975353232902,
            ],
        );
    }

    #[test]
    fn remaining_unary_rules_match_the_recurrence() {
        let g = Graph::new();
        let x = g.variable("x");
        let cases = [
            x.tan(),
            x.tanh(),
            x.asin(),
            x.acos(),
            x.atan(),
            x.logistic(),
            x.sqrt(),
            x.log_base(2.0),
            x.powf(3.5),
            x.exp() / x.ln(),
        ];
        for f in &cases {
            let h = f.hessian(&Feed::new().bind(&x, 0.6)).unwrap().scalar().unwrap();
            let d2 = f.nth_derivative(2, 0.6).unwrap();
            assert_abs_diff_eq!(h, d2, epsilon = 1e-9);
        }
    }

    #[test]
    fn variable_exponent_is_unsupported() {
        let g = Graph::new();
        let (x, y) = (g.variable("x"), g.variable("y"));
        let feed = Feed::new().bind(&x, 2.0).bind(&y, 3.0);
        assert!(matches!(
            x.pow(&y).hessian(&feed),
            Err(DiffError::Unsupported(_))
        ));
        // a constant exponent built from nodes is fine
        let e = g.constant(4.0) - 1.0;
        let h = x.pow(&e).hessian(&feed).unwrap();
        assert_eq!(h.scalar(), Some(12.0));
    }

    #[test]
    fn tables_are_symmetric_and_dense() {
        let g = Graph::new();
        let (x, y, z) = xyz(&g);
        let f = (&x * &y / &z).exp() + x.sin() * y.cos() - &z;
        let h = f.hessian_table(&at([&x, &y, &z], [0.3, -0.2, 1.5])).unwrap();
        assert!(h.is_symmetric(1e-12));
        assert_eq!(h.variables().len(), 3);
        assert_eq!(h.iter().count(), 9);
        assert_eq!(h.row(&z).len(), 3);
        let m = h.to_array().unwrap();
        assert_eq!(m.dim(), (3, 3));
        assert_abs_diff_eq!(m[[0, 1]], m[[1, 0]], epsilon = 1e-12);
    }

    #[test]
    fn each_node_gets_one_table() {
        let g = Graph::new();
        let (x, y) = (g.variable("x"), g.variable("y"));
        let s = (&x * &y).sin();
        let f = &s * &s - &s;
        let feed = Feed::new().bind(&x, 0.4).bind(&y, 1.3);
        let mut pass = HessianPass::new(&g, &feed);
        let root = pass.table(f.id()).unwrap();

        let reachable = pass.grad.eval.schedule(f.id(), |_| false);
        assert_eq!(reachable.len(), 6);
        assert_eq!(pass.tables.len(), reachable.len());
        assert!(pass
            .grad
            .eval
            .schedule(f.id(), |n| pass.tables.contains_key(&n))
            .is_empty());
        assert!(Rc::ptr_eq(&root, &pass.table(f.id()).unwrap()));
    }

    #[test]
    fn shared_nodes_give_the_same_table_as_trees() {
        let g = Graph::new();
        let (x, y) = (g.variable("x"), g.variable("y"));
        let s = (&x * &y).sin();
        let dag = &s * &s - &s;
        let tree = (&x * &y).sin() * (&x * &y).sin() - (&x * &y).sin();
        let feed = Feed::new().bind(&x, 0.4).bind(&y, 1.3);
        let h_dag = dag.hessian_table(&feed).unwrap().to_array().unwrap();
        let h_tree = tree.hessian_table(&feed).unwrap().to_array().unwrap();
        for (a, b) in h_dag.iter().zip(h_tree.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn variables_of_another_graph_read_as_zero() {
        let (ga, gb) = (Graph::new(), Graph::new());
        let xa = ga.variable("x");
        let yb = gb.variable("y");
        let zb = gb.variable("z");
        let f = &yb * &yb * &zb;
        let h = f
            .hessian_table(&Feed::new().bind(&yb, 1.0).bind(&zb, 3.0))
            .unwrap();
        assert_eq!(xa.id(), yb.id());
        assert_eq!(h.get(&yb, &yb).scalar(), Some(6.0));
        assert_eq!(h.get(&xa, &xa).scalar(), Some(0.0));
        assert_eq!(h.get(&xa, &zb).scalar(), Some(0.0));
    }

    #[test]
    fn collapse_follows_the_variable_count() {
        let g = Graph::new();
        let (x, y) = (g.variable("x"), g.variable("y"));
        let feed = Feed::new().bind(&x, 1.0).bind(&y, 1.0);
        assert!(matches!(
            (&x * &y).hessian(&feed),
            Ok(SecondDerivative::Table(_))
        ));
        assert!(matches!(
            (&x * &x).hessian(&feed),
            Ok(SecondDerivative::Single(_))
        ));
    }
}
