//! Numeric values: scalars and elementwise vectors.
//!
//! Every quantity the engines produce (values, partials, Hessian
//! entries) is a [`Value`]. Arithmetic is elementwise with
//! broadcasting:
//!
//! - scalar ⊕ array applies the scalar to every element,
//! - a length-1 array behaves like a scalar,
//! - two arrays must otherwise have the same length.
//!
//! Compatibility is checked once, during evaluation, through
//! [`Value::broadcast_len`]. The operators themselves assume it and
//! panic on a mismatch.
//!
//! ```
//! use symdiff::Value;
//!
//! let v = Value::from(vec![1.0, 2.0, 3.0]);
//! let w = &v * 2.0 + 1.0;
//! assert_eq!(w, Value::from(vec![3.0, 5.0, 7.0]));
//! assert_eq!(Value::from(4.0) - 1.5, Value::Scalar(2.5));
//! ```

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use algebra_core::{AbelianGroup, CommutativeMonoid, Group, Monoid, Semigroup};
use ndarray::Array1;
use num_traits::Zero;

use crate::error::{DiffError, Result};

/// A scalar or a one-dimensional array of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single number.
    Scalar(f64),
    /// An elementwise vector.
    Array(Array1<f64>),
}

impl Value {
    /// Length of the array, or `None` for a scalar.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(a) => Some(a.len()),
        }
    }

    /// The number as `f64` if this is a scalar.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            Value::Array(_) => None,
        }
    }

    /// The value as a single number; length-1 arrays are accepted.
    pub fn as_scalar(&self) -> Result<f64> {
        match self {
            Value::Scalar(x) => Ok(*x),
            Value::Array(a) if a.len() == 1 => Ok(a[0]),
            Value::Array(a) => Err(DiffError::NonScalar(a.len())),
        }
    }

    /// Length of the result of combining `a` and `b` elementwise.
    ///
    /// `None` means both are scalars.
    pub fn broadcast_len(a: &Value, b: &Value) -> Result<Option<usize>> {
        match (a.array_len(), b.array_len()) {
            (None, None) => Ok(None),
            (Some(n), None) | (None, Some(n)) => Ok(Some(n)),
            (Some(l), Some(r)) if l == r => Ok(Some(l)),
            (Some(1), Some(n)) | (Some(n), Some(1)) => Ok(Some(n)),
            (Some(left), Some(right)) => Err(DiffError::ShapeMismatch { left, right }),
        }
    }

    fn at(&self, i: usize) -> f64 {
        match self {
            Value::Scalar(x) => *x,
            Value::Array(a) if a.len() == 1 => a[0],
            Value::Array(a) => a[i],
        }
    }

    /// Apply `f` elementwise.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(*x)),
            Value::Array(a) => Value::Array(a.mapv(f)),
        }
    }

    /// Combine two values elementwise with broadcasting.
    ///
    /// # Panics
    ///
    /// Panics if the shapes cannot be broadcast together.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
        let len = match Value::broadcast_len(self, other) {
            Ok(len) => len,
            Err(e) => panic!("{e}"),
        };
        match len {
            None => Value::Scalar(f(self.at(0), other.at(0))),
            Some(n) => Value::Array(Array1::from_shape_fn(n, |i| f(self.at(i), other.at(i)))),
        }
    }

    /// Elementwise `self^exponent`.
    pub fn powv(&self, exponent: &Value) -> Value {
        self.zip_with(exponent, f64::powf)
    }

    /// Elementwise `self^p` for a fixed `p`.
    pub fn powf(&self, p: f64) -> Value {
        self.map(|x| x.powf(p))
    }

    /// Elementwise natural logarithm.
    pub fn ln(&self) -> Value {
        self.map(f64::ln)
    }

    /// Fail with [`DiffError::Domain`] on the first element rejected by `ok`.
    pub fn ensure(&self, op: &'static str, ok: impl Fn(f64) -> bool) -> Result<()> {
        let bad = match self {
            Value::Scalar(x) => (!ok(*x)).then_some(*x),
            Value::Array(a) => a.iter().copied().find(|x| !ok(*x)),
        };
        match bad {
            Some(value) => Err(DiffError::Domain { op, value }),
            None => Ok(()),
        }
    }

    /// Like [`Value::ensure`] over broadcast pairs; reports the left element.
    pub fn ensure_with(
        &self,
        other: &Value,
        op: &'static str,
        ok: impl Fn(f64, f64) -> bool,
    ) -> Result<()> {
        let n = Value::broadcast_len(self, other)?.unwrap_or(1);
        match (0..n).find(|&i| !ok(self.at(i), other.at(i))) {
            Some(i) => Err(DiffError::Domain {
                op,
                value: self.at(i),
            }),
            None => Ok(()),
        }
    }

    /// Elementwise comparison within an absolute tolerance.
    pub fn approx_eq(&self, other: &Value, tol: f64) -> bool {
        let Ok(len) = Value::broadcast_len(self, other) else {
            return false;
        };
        (0..len.unwrap_or(1)).all(|i| {
            let (a, b) = (self.at(i), other.at(i));
            a == b || (a - b).abs() <= tol
        })
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(0.0)
    }
}

impl std::iter::Sum for Value {
    fn sum<I: Iterator<Item = Value>>(iter: I) -> Value {
        Value::concat(iter)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Scalar(f64::from(x))
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(Array1::from(v))
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Value::Array(Array1::from(v.to_vec()))
    }
}

impl From<Array1<f64>> for Value {
    fn from(a: Array1<f64>) -> Self {
        Value::Array(a)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => write!(f, "{x}"),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, x) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! impl_value_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Value> for &Value {
            type Output = Value;
            fn $method(self, rhs: &Value) -> Value {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait<Value> for Value {
            type Output = Value;
            fn $method(self, rhs: Value) -> Value {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&Value> for Value {
            type Output = Value;
            fn $method(self, rhs: &Value) -> Value {
                (&self).$method(rhs)
            }
        }

        impl $trait<Value> for &Value {
            type Output = Value;
            fn $method(self, rhs: Value) -> Value {
                self.$method(&rhs)
            }
        }

        impl $trait<f64> for &Value {
            type Output = Value;
            fn $method(self, rhs: f64) -> Value {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<f64> for Value {
            type Output = Value;
            fn $method(self, rhs: f64) -> Value {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<&Value> for f64 {
            type Output = Value;
            fn $method(self, rhs: &Value) -> Value {
                rhs.map(|b| self $op b)
            }
        }

        impl $trait<Value> for f64 {
            type Output = Value;
            fn $method(self, rhs: Value) -> Value {
                rhs.map(|b| self $op b)
            }
        }
    };
}

impl_value_binop!(Add, add, +);
impl_value_binop!(Sub, sub, -);
impl_value_binop!(Mul, mul, *);
impl_value_binop!(Div, div, /);

impl Neg for &Value {
    type Output = Value;
    fn neg(self) -> Value {
        self.map(|a| -a)
    }
}

impl Neg for Value {
    type Output = Value;
    fn neg(self) -> Value {
        -&self
    }
}

impl Zero for Value {
    fn zero() -> Self {
        Value::Scalar(0.0)
    }

    fn is_zero(&self) -> bool {
        match self {
            Value::Scalar(x) => *x == 0.0,
            Value::Array(a) => a.iter().all(|x| *x == 0.0),
        }
    }
}

impl Semigroup for Value {
    fn combine(&self, other: &Self) -> Self {
        self + other
    }
}

impl Monoid for Value {
    fn empty() -> Self {
        Value::zero()
    }
}

impl CommutativeMonoid for Value {}

impl Group for Value {
    fn inverse(&self) -> Self {
        -self
    }
}

impl AbelianGroup for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_arithmetic() {
        let a = Value::from(6.0);
        let b = Value::from(4.0);
        assert_eq!(&a + &b, Value::Scalar(10.0));
        assert_eq!(&a - &b, Value::Scalar(2.0));
        assert_eq!(&a * &b, Value::Scalar(24.0));
        assert_eq!(&a / &b, Value::Scalar(1.5));
        assert_eq!(-a, Value::Scalar(-6.0));
    }

    #[test]
    fn scalar_broadcasts_over_array() {
        let v = Value::from(vec![1.0, 2.0]);
        assert_eq!(10.0 - &v, Value::from(vec![9.0, 8.0]));
        assert_eq!(&v * Value::from(3.0), Value::from(vec![3.0, 6.0]));
    }

    #[test]
    fn length_one_array_broadcasts() {
        let one = Value::from(vec![2.0]);
        let v = Value::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(Value::broadcast_len(&one, &v), Ok(Some(3)));
        assert_eq!(&one * &v, Value::from(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn incompatible_lengths_are_reported() {
        let a = Value::from(vec![1.0, 2.0]);
        let b = Value::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(
            Value::broadcast_len(&a, &b),
            Err(DiffError::ShapeMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    #[should_panic(expected = "cannot broadcast")]
    fn operators_panic_on_mismatch() {
        let _ = Value::from(vec![1.0, 2.0]) + Value::from(vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn as_scalar_rejects_long_arrays() {
        assert_eq!(Value::from(vec![5.0]).as_scalar(), Ok(5.0));
        assert_eq!(
            Value::from(vec![1.0, 2.0]).as_scalar(),
            Err(DiffError::NonScalar(2))
        );
    }

    #[test]
    fn ensure_reports_first_bad_element() {
        let v = Value::from(vec![1.0, -2.0, -3.0]);
        assert_eq!(
            v.ensure("ln", |x| x > 0.0),
            Err(DiffError::Domain {
                op: "ln",
                value: -2.0
            })
        );
        assert!(Value::from(2.0).ensure("ln", |x| x > 0.0).is_ok());
    }

    #[test]
    fn value_is_an_additive_group() {
        let v = Value::from(vec![1.0, -4.0]);
        assert!(v.combine(&v.inverse()).is_zero());
        assert_eq!(Value::empty(), Value::Scalar(0.0));
    }

    #[test]
    fn display_lists_elements() {
        assert_eq!(Value::from(vec![1.0, 2.5]).to_string(), "[1, 2.5]");
        assert_eq!(Value::from(3.0).to_string(), "3");
    }
}
