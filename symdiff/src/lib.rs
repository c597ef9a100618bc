//! Symbolic automatic differentiation over an immutable expression graph.
//!
//! Expressions are built with ordinary operators on [`Expr`] handles that
//! all live in one [`Graph`]. Nodes are never modified once created, so
//! one expression can be evaluated and differentiated any number of times
//! at different points:
//!
//! - **Evaluation**: [`Expr::evaluate`] with variables bound by a [`Feed`]
//! - **First derivatives**: [`Expr::gradient`] and [`Expr::derivative`]
//! - **Symbolic derivatives**: [`Expr::symbolic_derivative`] appends the
//!   derivative as a new expression in the same graph
//! - **Higher orders**: [`Expr::nth_derivative`] via truncated Taylor
//!   series ([`Jet`])
//! - **Second partials**: [`Expr::hessian`]
//!
//! # Evaluating and differentiating
//!
//! ```
//! use symdiff::{Feed, Graph};
//!
//! let g = Graph::new();
//! let (x, y) = (g.variable("x"), g.variable("y"));
//!
//! // f(x, y) = x² + x*y
//! let f = &x * &x + &x * &y;
//! let at = Feed::new().bind(&x, 3.0).bind(&y, 4.0);
//!
//! assert_eq!(f.evaluate(&at).unwrap().scalar(), Some(21.0));
//!
//! let grad = f.gradient(&at).unwrap();
//! assert_eq!(grad.wrt(&x).scalar(), Some(10.0)); // 2x + y
//! assert_eq!(grad.wrt(&y).scalar(), Some(3.0)); // x
//! ```
//!
//! # Higher-order derivatives
//!
//! ```
//! use symdiff::Graph;
//!
//! let g = Graph::new();
//! let x = g.variable("x");
//! let f = &x * &x * &x + (2.0 * &x).sin();
//!
//! // f‴(0) = 6 - 8 cos(0)
//! let d3 = f.nth_derivative(3, 0.0).unwrap();
//! assert!((d3 + 2.0).abs() < 1e-12);
//!
//! let d = f.symbolic_derivative_n(2).unwrap();
//! println!("f'' = {d}");
//! ```

pub mod error;
mod eval;
pub mod feed;
pub mod grad;
pub mod graph;
pub mod hessian;
mod symbolic;
pub mod taylor;
pub mod value;

pub use error::{DiffError, Result};
pub use feed::Feed;
pub use grad::{Derivative, Gradient};
pub use graph::{BinaryOp, Expr, Graph, NodeId, Operand, UnaryOp};
pub use hessian::{Hessian, SecondDerivative};
pub use taylor::Jet;
pub use value::Value;
