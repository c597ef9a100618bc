//! Higher-order derivatives of single-variable expressions.
//!
//! Every node is expanded into a truncated Taylor series around the
//! bound point, a [`Jet`] `[h_0, …, h_n]` with `h_k = h^{(k)}(x_0) / k!`.
//! Jets of interior nodes come from the jets of their operands through
//! convolution recurrences: the Cauchy product for `·`, and for each
//! elementary function the recurrence that follows from the ODE it
//! satisfies (`exp′ = exp·u′`, `sin′ = cos·u′`, `u·ln′ = u′`, …), solved
//! for the highest unknown coefficient. The n-th derivative is then
//! `n!·h_n` of the root.
//!
//! ```
//! use symdiff::Graph;
//!
//! let g = Graph::new();
//! let x = g.variable("x");
//! let f = (2.0 * &x).sin();
//! let d3 = f.nth_derivative(3, 0.0).unwrap();
//! assert!((d3 + 8.0).abs() < 1e-12);
//! ```

use std::cell::Ref;
use std::collections::HashMap;
use std::ops::{Add, Mul, Neg, Sub};

use num_traits::Float;

use crate::error::{DiffError, Result};
use crate::feed::Feed;
use crate::graph::{Arena, BinaryOp, Expr, Graph, NodeId, NodeKind, UnaryOp};

fn cast<T: Float>(k: usize) -> T {
    num_traits::cast(k).unwrap_or_else(T::nan)
}

fn domain<T: Float>(op: &'static str, x: T) -> DiffError {
    DiffError::Domain {
        op,
        value: x.to_f64().unwrap_or(f64::NAN),
    }
}

/// `(h·h)_m`
fn square<T: Float>(h: &[T], m: usize) -> T {
    (0..=m).fold(T::zero(), |s, j| s + h[j] * h[m - j])
}

fn delta<T: Float>(m: usize) -> T {
    if m == 0 {
        T::one()
    } else {
        T::zero()
    }
}

/// A truncated Taylor series: normalized coefficients `h_k = h^{(k)} / k!`.
///
/// All jets combined together must share the same order.
///
/// ```
/// use symdiff::Jet;
///
/// // 1 / (1 - x) around 0 is the geometric series
/// let x = Jet::variable(0.0, 4);
/// let one = Jet::constant(1.0, 4);
/// let g = one.try_div(&(&one - &x)).unwrap();
/// assert_eq!(g.coeffs(), &[1.0, 1.0, 1.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Jet<T> {
    coeffs: Vec<T>,
}

impl<T: Float> Jet<T> {
    /// A jet from raw normalized coefficients.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs` is empty.
    pub fn new(coeffs: Vec<T>) -> Self {
        assert!(!coeffs.is_empty(), "a jet needs at least the value");
        Self { coeffs }
    }

    /// `c` with every derivative zero.
    pub fn constant(c: T, order: usize) -> Self {
        let mut coeffs = vec![T::zero(); order + 1];
        coeffs[0] = c;
        Self { coeffs }
    }

    /// The independent variable at `x`: `[x, 1, 0, …]`.
    pub fn variable(x: T, order: usize) -> Self {
        let mut jet = Self::constant(x, order);
        if order > 0 {
            jet.coeffs[1] = T::one();
        }
        jet
    }

    /// Highest coefficient index.
    pub fn order(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// `h_0`
    pub fn value(&self) -> T {
        self.coeffs[0]
    }

    /// Normalized coefficients `h_0 … h_n`.
    pub fn coeffs(&self) -> &[T] {
        &self.coeffs
    }

    /// `h^{(k)} = k!·h_k`; zero beyond the jet's order.
    pub fn derivative(&self, k: usize) -> T {
        self.coeffs.get(k).map_or_else(T::zero, |&c| {
            (1..=k).fold(c, |acc, i| acc * cast::<T>(i))
        })
    }

    /// `[h, h′, h″, …]`
    pub fn derivatives(&self) -> Vec<T> {
        (0..self.coeffs.len()).map(|k| self.derivative(k)).collect()
    }

    fn is_constant(&self) -> bool {
        self.coeffs[1..].iter().all(|c| c.is_zero())
    }

    /// Quotient by the recurrence `h_n = (a_n − Σ_{k<n} h_k·b_{n−k}) / b_0`.
    ///
    /// At order zero a zero divisor follows IEEE; above it the
    /// recurrence itself would divide by zero and is rejected.
    pub fn try_div(&self, rhs: &Self) -> Result<Self> {
        let (a, b) = (&self.coeffs, &rhs.coeffs);
        let len = a.len().min(b.len());
        let b0 = b[0];
        if len > 1 && b0.is_zero() {
            return Err(DiffError::DivisionByZero("division"));
        }
        let mut h = Vec::with_capacity(len);
        h.push(a[0] / b0);
        for n in 1..len {
            let s = (0..n).fold(T::zero(), |s, k| s + h[k] * b[n - k]);
            h.push((a[n] - s) / b0);
        }
        Ok(Self { coeffs: h })
    }

    /// Solve `h′ = w(h)·a′` for `h`, where `w(h, m)` is the m-th
    /// coefficient of `w` and may read `h_0 … h_m`.
    fn integrate(&self, h0: T, w: impl Fn(&[T], usize) -> T) -> Self {
        let a = &self.coeffs;
        let mut h = Vec::with_capacity(a.len());
        let mut ws: Vec<T> = Vec::with_capacity(a.len());
        h.push(h0);
        for n in 1..a.len() {
            ws.push(w(&h, n - 1));
            let s = (1..=n).fold(T::zero(), |s, k| s + cast::<T>(k) * a[k] * ws[n - k]);
            h.push(s / cast::<T>(n));
        }
        Self { coeffs: h }
    }

    /// Solve `r·h′ = a′` for `h`. The caller guarantees `r_0 ≠ 0`.
    fn solve(&self, h0: T, r: &[T]) -> Self {
        let a = &self.coeffs;
        let mut h = Vec::with_capacity(a.len());
        h.push(h0);
        for n in 1..a.len() {
            let s = (1..n).fold(T::zero(), |s, k| s + cast::<T>(k) * h[k] * r[n - k]);
            h.push((cast::<T>(n) * a[n] - s) / (cast::<T>(n) * r[0]));
        }
        Self { coeffs: h }
    }

    /// Sine and cosine (or their hyperbolic versions, `sign = 1`) together.
    fn rotate(&self, s0: T, c0: T, sign: T) -> (Self, Self) {
        let a = &self.coeffs;
        let (mut s, mut c) = (vec![s0], vec![c0]);
        for n in 1..a.len() {
            let (ss, cs) = (1..=n).fold((T::zero(), T::zero()), |(ss, cs), k| {
                let ka = cast::<T>(k) * a[k];
                (ss + ka * c[n - k], cs + ka * s[n - k])
            });
            s.push(ss / cast::<T>(n));
            c.push(sign * cs / cast::<T>(n));
        }
        (Self { coeffs: s }, Self { coeffs: c })
    }

    /// `e^a`
    pub fn exp(&self) -> Self {
        self.integrate(self.value().exp(), |h, m| h[m])
    }

    /// `ln a`; needs `a_0 > 0`.
    pub fn ln(&self) -> Result<Self> {
        let a0 = self.value();
        if a0 <= T::zero() {
            return Err(domain("ln", a0));
        }
        Ok(self.solve(a0.ln(), &self.coeffs))
    }

    /// `log_b a`; needs `a_0 > 0`.
    pub fn log_base(&self, b: T) -> Result<Self> {
        if self.value() <= T::zero() {
            return Err(domain("log", self.value()));
        }
        let scale = b.ln().recip();
        Ok(self.ln()?.scale(scale))
    }

    /// `sin a` and `cos a`.
    pub fn sin_cos(&self) -> (Self, Self) {
        let a0 = self.value();
        self.rotate(a0.sin(), a0.cos(), -T::one())
    }

    /// `sinh a` and `cosh a`.
    pub fn sinh_cosh(&self) -> (Self, Self) {
        let a0 = self.value();
        self.rotate(a0.sinh(), a0.cosh(), T::one())
    }

    /// `tan a`, from `tan′ = (1 + tan²)·a′`.
    pub fn tan(&self) -> Self {
        self.integrate(self.value().tan(), |h, m| delta::<T>(m) + square(h, m))
    }

    /// `tanh a`, from `tanh′ = (1 − tanh²)·a′`.
    pub fn tanh(&self) -> Self {
        self.integrate(self.value().tanh(), |h, m| delta::<T>(m) - square(h, m))
    }

    /// `σ(a)`, from `σ′ = (σ − σ²)·a′`.
    pub fn logistic(&self) -> Self {
        let s0 = (T::one() + (-self.value()).exp()).recip();
        self.integrate(s0, |h, m| h[m] - square(h, m))
    }

    fn arcsine(&self, op: &'static str, h0: T) -> Result<Self> {
        let a0 = self.value();
        if a0.abs() > T::one() {
            return Err(domain(op, a0));
        }
        if self.order() == 0 {
            return Ok(Self::constant(h0, 0));
        }
        if a0.abs() == T::one() {
            return Err(DiffError::DivisionByZero(op));
        }
        let one = Self::constant(T::one(), self.order());
        let r = (&one - &(self * self)).powf(cast::<T>(1) / cast::<T>(2))?;
        Ok(self.solve(h0, &r.coeffs))
    }

    /// `asin a`; needs `|a_0| ≤ 1`, and `|a_0| < 1` beyond order zero.
    pub fn asin(&self) -> Result<Self> {
        self.arcsine("asin", self.value().asin())
    }

    /// `acos a = π/2 − asin a`.
    pub fn acos(&self) -> Result<Self> {
        let mut h = self.arcsine("acos", self.value().asin())?;
        h.coeffs.iter_mut().for_each(|c| *c = -*c);
        h.coeffs[0] = self.value().acos();
        Ok(h)
    }

    /// `atan a`, from `(1 + a²)·h′ = a′`.
    pub fn atan(&self) -> Self {
        let one = Self::constant(T::one(), self.order());
        let r = &one + &(self * self);
        self.solve(self.value().atan(), &r.coeffs)
    }

    /// `a^p` for a fixed exponent.
    ///
    /// Uses `n·a_0·h_n = Σ_{k=1}^{n} (p·k − (n−k))·a_k·h_{n−k}`. When
    /// `a_0 = 0` only non-negative integer powers are defined; they are
    /// expanded as repeated products.
    pub fn powf(&self, p: T) -> Result<Self> {
        let a = &self.coeffs;
        let a0 = a[0];
        if a0 < T::zero() && !p.fract().is_zero() {
            return Err(domain("powf", a0));
        }
        if a.len() == 1 {
            return Ok(Self::constant(a0.powf(p), 0));
        }
        if a0.is_zero() {
            return match p.to_u32() {
                Some(k) if p.fract().is_zero() => Ok(self.powi(k)),
                _ => Err(DiffError::DivisionByZero("power")),
            };
        }
        let mut h = Vec::with_capacity(a.len());
        h.push(a0.powf(p));
        for n in 1..a.len() {
            let s = (1..=n).fold(T::zero(), |s, k| {
                s + (p * cast::<T>(k) - cast::<T>(n - k)) * a[k] * h[n - k]
            });
            h.push(s / (cast::<T>(n) * a0));
        }
        Ok(Self { coeffs: h })
    }

    /// `a^k` by repeated squaring of Cauchy products.
    ///
    /// With `a_0 = 0` the series starts at degree `k`, so every
    /// coefficient is zero once `k` exceeds the order.
    pub fn powi(&self, k: u32) -> Self {
        if self.value().is_zero() && k as usize > self.order() {
            return Self::constant(T::zero(), self.order());
        }
        let mut acc = Self::constant(T::one(), self.order());
        let mut base = self.clone();
        let mut k = k;
        while k > 0 {
            if k & 1 == 1 {
                acc = &acc * &base;
            }
            k >>= 1;
            if k > 0 {
                base = &base * &base;
            }
        }
        acc
    }

    /// `√a`
    pub fn sqrt(&self) -> Result<Self> {
        if self.value() < T::zero() {
            return Err(domain("sqrt", self.value()));
        }
        self.powf(cast::<T>(1) / cast::<T>(2))
    }

    /// `a^g` for a jet exponent: a fixed power when `g` is constant,
    /// otherwise `exp(g·ln a)` with `a_0 > 0`.
    pub fn pow(&self, g: &Self) -> Result<Self> {
        if g.is_constant() {
            return self.powf(g.value());
        }
        if self.value() <= T::zero() {
            return Err(domain("pow", self.value()));
        }
        Ok((&self.ln()? * g).exp())
    }

    /// Every coefficient times `k`.
    pub fn scale(&self, k: T) -> Self {
        Self {
            coeffs: self.coeffs.iter().map(|&c| c * k).collect(),
        }
    }
}

impl<T: Float> Add for &Jet<T> {
    type Output = Jet<T>;
    fn add(self, rhs: Self) -> Jet<T> {
        Jet {
            coeffs: self.coeffs.iter().zip(&rhs.coeffs).map(|(&a, &b)| a + b).collect(),
        }
    }
}

impl<T: Float> Sub for &Jet<T> {
    type Output = Jet<T>;
    fn sub(self, rhs: Self) -> Jet<T> {
        Jet {
            coeffs: self.coeffs.iter().zip(&rhs.coeffs).map(|(&a, &b)| a - b).collect(),
        }
    }
}

/// Cauchy product.
impl<T: Float> Mul for &Jet<T> {
    type Output = Jet<T>;
    fn mul(self, rhs: Self) -> Jet<T> {
        let (a, b) = (&self.coeffs, &rhs.coeffs);
        let len = a.len().min(b.len());
        Jet {
            coeffs: (0..len)
                .map(|n| (0..=n).fold(T::zero(), |s, k| s + a[k] * b[n - k]))
                .collect(),
        }
    }
}

impl<T: Float> Neg for &Jet<T> {
    type Output = Jet<T>;
    fn neg(self) -> Jet<T> {
        self.scale(-T::one())
    }
}

struct TaylorPass<'a> {
    arena: Ref<'a, Arena>,
    feed: &'a Feed,
    order: usize,
    jets: HashMap<NodeId, Jet<f64>>,
}

impl<'a> TaylorPass<'a> {
    fn new(graph: &'a Graph, feed: &'a Feed, order: usize) -> Self {
        Self {
            arena: graph.arena(),
            feed,
            order,
            jets: HashMap::new(),
        }
    }

    fn jet(&mut self, id: NodeId) -> Result<&Jet<f64>> {
        for n in self.arena.schedule(id, |n| self.jets.contains_key(&n)) {
            let jet = self.compute(n)?;
            log::trace!("jet {n}: {:?}", jet.coeffs());
            self.jets.insert(n, jet);
        }
        Ok(&self.jets[&id])
    }

    fn compute(&self, id: NodeId) -> Result<Jet<f64>> {
        let n = self.order;
        let jet = match &self.arena.node(id).kind {
            NodeKind::Variable { name } => {
                let key = (self.arena.graph_id(), id);
                let x = self.feed.lookup(key, name.as_deref())?.as_scalar()?;
                Jet::variable(x, n)
            }
            NodeKind::Constant(c) => Jet::constant(c.as_scalar()?, n),
            NodeKind::Unary(op, a) => unary(*op, &self.jets[a])?,
            NodeKind::Binary(op, a, b) => {
                let (f, g) = (&self.jets[a], &self.jets[b]);
                match op {
                    BinaryOp::Add => f + g,
                    BinaryOp::Sub => f - g,
                    BinaryOp::Mul => f * g,
                    BinaryOp::Div => f.try_div(g)?,
                    BinaryOp::Pow => f.pow(g)?,
                }
            }
        };
        Ok(jet)
    }
}

fn unary(op: UnaryOp, a: &Jet<f64>) -> Result<Jet<f64>> {
    Ok(match op {
        UnaryOp::Neg => -a,
        UnaryOp::Sin => a.sin_cos().0,
        UnaryOp::Cos => a.sin_cos().1,
        UnaryOp::Tan => a.tan(),
        UnaryOp::Sinh => a.sinh_cosh().0,
        UnaryOp::Cosh => a.sinh_cosh().1,
        UnaryOp::Tanh => a.tanh(),
        UnaryOp::Exp => a.exp(),
        UnaryOp::Ln => a.ln()?,
        UnaryOp::Powf(p) => a.powf(p)?,
        UnaryOp::Asin => a.asin()?,
        UnaryOp::Acos => a.acos()?,
        UnaryOp::Atan => a.atan(),
        UnaryOp::Logistic => a.logistic(),
        UnaryOp::Sqrt => a.sqrt()?,
        UnaryOp::LogBase(b) => a.log_base(b)?,
    })
}

impl Expr {
    /// Taylor jet of order `order` around the point bound in `feed`.
    ///
    /// Fails with [`DiffError::MultipleVariables`] if the expression has
    /// more than one free variable and with [`DiffError::NonScalar`] for
    /// array bindings.
    pub fn jet(&self, order: usize, feed: &Feed) -> Result<Jet<f64>> {
        let free = self.dep_ids().len();
        if free > 1 {
            return Err(DiffError::MultipleVariables(free));
        }
        log::debug!("jet of {} to order {order}", self.id());
        let mut pass = TaylorPass::new(self.graph(), feed, order);
        pass.jet(self.id()).cloned()
    }

    /// `d^order/dx^order` at the point bound in `feed`.
    pub fn nth_derivative_with(&self, order: usize, feed: &Feed) -> Result<f64> {
        Ok(self.jet(order, feed)?.derivative(order))
    }

    /// `d^order/dx^order` at `x = point`, binding the only free variable.
    ///
    /// ```
    /// use symdiff::Graph;
    ///
    /// let g = Graph::new();
    /// let x = g.variable("x");
    /// let f = x.powf(3.0);
    /// let ds: Vec<f64> = [0, 1, 3, 5]
    ///     .into_iter()
    ///     .map(|n| f.nth_derivative(n, 2.0).unwrap())
    ///     .collect();
    /// assert_eq!(ds, vec![8.0, 12.0, 6.0, 0.0]);
    /// ```
    pub fn nth_derivative(&self, order: usize, point: f64) -> Result<f64> {
        let vars = self.dependent_variables();
        if vars.len() > 1 {
            return Err(DiffError::MultipleVariables(vars.len()));
        }
        let feed: Feed = vars.iter().map(|v| (v, point)).collect();
        self.nth_derivative_with(order, &feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_coeffs(jet: &Jet<f64>, expected: &[f64]) {
        assert_eq!(jet.coeffs().len(), expected.len());
        for (got, want) in jet.coeffs().iter().zip(expected) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn known_series_at_zero() {
        let x = Jet::variable(0.0, 4);
        let one = Jet::constant(1.0, 4);
        check_coeffs(&x.exp(), &[1.0, 1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0]);
        let (s, c) = x.sin_cos();
        check_coeffs(&s, &[0.0, 1.0, 0.0, -1.0 / 6.0, 0.0]);
        check_coeffs(&c, &[1.0, 0.0, -0.5, 0.0, 1.0 / 24.0]);
        let (sh, ch) = x.sinh_cosh();
        check_coeffs(&sh, &[0.0, 1.0, 0.0, 1.0 / 6.0, 0.0]);
        check_coeffs(&ch, &[1.0, 0.0, 0.5, 0.0, 1.0 / 24.0]);
        check_coeffs(&(&one + &x).ln().unwrap(), &[0.0, 1.0, -0.5, 1.0 / 3.0, -0.25]);
        check_coeffs(&x.tan(), &[0.0, 1.0, 0.0, 1.0 / 3.0, 0.0]);
        check_coeffs(&x.tanh(), &[0.0, 1.0, 0.0, -1.0 / 3.0, 0.0]);
        check_coeffs(&x.atan(), &[0.0, 1.0, 0.0, -1.0 / 3.0, 0.0]);
        check_coeffs(&x.asin().unwrap(), &[0.0, 1.0, 0.0, 1.0 / 6.0, 0.0]);
        check_coeffs(&x.logistic(), &[0.5, 0.25, 0.0, -1.0 / 48.0, 0.0]);
    }

    #[test]
    fn first_coefficient_is_the_derivative() {
        let x = Jet::variable(0.7, 1);
        assert_relative_eq!(x.sqrt().unwrap().coeffs()[1], 0.5 / 0.7_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(x.acos().unwrap().coeffs()[1], -1.0 / 0.51_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(x.log_base(2.0).unwrap().coeffs()[1], 1.0 / (0.7 * 2.0_f64.ln()), epsilon = 1e-12);
        assert_relative_eq!(x.powf(2.5).unwrap().coeffs()[1], 2.5 * 0.7_f64.powf(1.5), epsilon = 1e-12);
    }

    #[test]
    fn high_order_scenarios() {
        let g = Graph::new();
        let x = g.variable("x");
        assert_relative_eq!((2.0 * &x).sin().nth_derivative(3, 0.0).unwrap(), -8.0, epsilon = 1e-12);
        assert_relative_eq!((3.0 * &x).exp().nth_derivative(3, 0.0).unwrap(), 27.0, epsilon = 1e-12);
        assert_relative_eq!((2.0 * &x).ln().nth_derivative(3, 0.5).unwrap(), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn polynomial_quotient() {
        let g = Graph::new();
        let x = g.variable("x");
        let f = x.powf(5.0) / x.powf(2.0);
        for (n, want) in [(0, 8.0), (1, 12.0), (3, 6.0), (5, 0.0)] {
            assert_relative_eq!(f.nth_derivative(n, 2.0).unwrap(), want, epsilon = 1e-9);
        }
    }

    #[test]
    fn integer_powers_at_zero() {
        let g = Graph::new();
        let x = g.variable("x");
        let sq = x.powf(2.0);
        assert_eq!(sq.nth_derivative(1, 0.0), Ok(0.0));
        assert_eq!(sq.nth_derivative(2, 0.0), Ok(2.0));
        assert_eq!(sq.nth_derivative(4, 0.0), Ok(0.0));
        assert_eq!(x.pow(3.0).nth_derivative(3, 0.0), Ok(6.0));
    }

    #[test]
    fn huge_integer_powers_stay_cheap() {
        let at_zero = Jet::variable(0.0, 3);
        assert_eq!(at_zero.powi(u32::MAX).coeffs(), &[0.0; 4]);
        assert_eq!(at_zero.powf(1e9), Ok(Jet::constant(0.0, 3)));
        assert_eq!(at_zero.powi(3).coeffs(), &[0.0, 0.0, 0.0, 1.0]);

        let at_one = Jet::variable(1.0, 2);
        assert_eq!(at_one.powi(10).coeffs(), &[1.0, 10.0, 45.0]);
    }

    #[test]
    fn singular_powers_at_zero() {
        let g = Graph::new();
        let x = g.variable("x");
        assert_eq!(
            x.powf(-1.0).nth_derivative(2, 0.0),
            Err(DiffError::DivisionByZero("power"))
        );
        assert_eq!(
            x.powf(3.5).nth_derivative(1, 0.0),
            Err(DiffError::DivisionByZero("power"))
        );
        assert_eq!(
            (1.0 / &x).nth_derivative(1, 0.0),
            Err(DiffError::DivisionByZero("division"))
        );
    }

    #[test]
    fn variable_exponent() {
        let g = Graph::new();
        let x = g.variable("x");
        let two = g.constant(2.0);
        let f = two.pow(&x);
        assert_eq!(f.nth_derivative(0, 5.0), Ok(32.0));
        let ln2 = 2.0_f64.ln();
        assert_relative_eq!(f.nth_derivative(3, 5.0).unwrap(), 32.0 * ln2.powi(3), epsilon = 1e-9);
    }

    #[test]
    fn constant_expressions() {
        let g = Graph::new();
        let c = g.constant(5.0) * 2.0;
        assert_eq!(c.nth_derivative(0, 1.0), Ok(10.0));
        assert_eq!(c.nth_derivative(2, 1.0), Ok(0.0));
    }

    #[test]
    fn rejects_several_variables_and_arrays() {
        let g = Graph::new();
        let (x, y) = (g.variable("x"), g.variable("y"));
        assert_eq!(
            (&x * &y).nth_derivative(1, 1.0),
            Err(DiffError::MultipleVariables(2))
        );
        let feed = Feed::new().bind(&x, vec![1.0, 2.0]);
        assert_eq!(x.sin().nth_derivative_with(1, &feed), Err(DiffError::NonScalar(2)));
    }

    #[test]
    fn matches_repeated_symbolic_differentiation() {
        let g = Graph::new();
        let x = g.variable("x");
        let cases = [
            x.sin() * x.exp(),
            x.ln() / &x,
            x.tan() + x.tanh(),
            x.sqrt() + x.atan(),
            x.logistic() * x.cosh() - x.sinh(),
            x.asin() - x.acos(),
            x.log_base(10.0) * x.powf(2.5),
            x.pow(&x),
        ];
        for f in &cases {
            for n in [0, 1, 2, 3, 5] {
                let recurrence = f.nth_derivative(n, 0.3).unwrap();
                let symbolic = f
                    .symbolic_derivative_n(n)
                    .unwrap()
                    .evaluate(&Feed::new().bind(&x, 0.3))
                    .unwrap()
                    .as_scalar()
                    .unwrap();
                assert_relative_eq!(recurrence, symbolic, max_relative = 1e-8, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn fifth_derivative_of_a_composite() {
        let g = Graph::new();
        let x = g.variable("x");
        let x2 = x.powf(2.0);
        let f = -12.0 * x2.cos() + 8.0 * x.powf(3.0) * x2.sin();
        let symbolic = f
            .symbolic_derivative_n(5)
            .unwrap()
            .evaluate(&Feed::new().bind(&x, 2.0))
            .unwrap()
            .as_scalar()
            .unwrap();
        assert_relative_eq!(f.nth_derivative(5, 2.0).unwrap(), symbolic, max_relative = 1e-9);
    }
}
