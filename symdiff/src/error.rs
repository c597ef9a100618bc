//! Errors raised by the evaluation and differentiation engines.

/// Errors returned by every entry point on [`Expr`](crate::Expr).
///
/// All of them abort the current call; the per-call caches are
/// dropped with it and nothing on the graph changes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiffError {
    /// A variable leaf had no binding, neither by identity nor by name.
    #[error("unbound variable {0}")]
    UnboundVariable(String),
    /// A math function was applied outside its domain
    /// (e.g. `ln` of a non-positive number).
    #[error("{op}: argument {value} is outside the domain")]
    Domain {
        /// The operation that rejected its argument.
        op: &'static str,
        /// The offending argument.
        value: f64,
    },
    /// The requested computation has no rule for this operator.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// A Taylor recurrence had to divide by a zero leading coefficient.
    #[error("division by zero in the {0} recurrence")]
    DivisionByZero(&'static str),
    /// Two array values could not be broadcast together.
    #[error("cannot broadcast arrays of length {left} and {right}")]
    ShapeMismatch {
        /// Length of the left operand.
        left: usize,
        /// Length of the right operand.
        right: usize,
    },
    /// A single-variable operation was asked of an expression with
    /// several free variables.
    #[error("expected at most one free variable, found {0}")]
    MultipleVariables(usize),
    /// A scalar was required but an array was bound.
    #[error("expected a scalar, found an array of length {0}")]
    NonScalar(usize),
}

/// Result alias used throughout the crate.
pub type Result<T, E = DiffError> = std::result::Result<T, E>;
