//! Gradients and Hessians of multivariable expressions.
//!
//! Run with: `cargo run --example hessian`

use symdiff::{Feed, Graph, SecondDerivative};

fn main() {
    println!("=== Gradients and Hessians ===\n");

    let g = Graph::new();
    let (x, y, z) = (g.variable("x"), g.variable("y"), g.variable("z"));

    // Example 1: polynomial with a rational term
    // f(x, y, z) = 3x²y + (z - 1/x)⁵ at (1, 2, 3)
    println!("Example 1: f(x, y, z) = 3x²y + (z - 1/x)⁵ at (1, 2, 3)");
    let f = 3.0 * &x * &x * &y + (&z - 1.0 / &x).pow(5.0);
    let at = Feed::new().bind(&x, 1.0).bind(&y, 2.0).bind(&z, 3.0);
    report(&f, &at);

    // Example 2: Rosenbrock function
    // f(x, y) = (1-x)² + 100(y-x²)²
    println!("Example 2: Rosenbrock f(x, y) = (1-x)² + 100(y-x²)² at (1, 1)");
    let rosenbrock = (1.0 - &x).powf(2.0) + 100.0 * (&y - &x * &x).powf(2.0);
    let at = Feed::new().bind(&x, 1.0).bind(&y, 1.0);
    report(&rosenbrock, &at);

    // Example 3: one variable collapses to f''
    println!("Example 3: f(x) = sin(5x + 3) at x = 1");
    let s = (5.0 * &x + 3.0).sin();
    match s.hessian(&Feed::new().bind(&x, 1.0)) {
        Ok(SecondDerivative::Single(v)) => {
            println!("  f''(1) = {v} (expected: -25·sin(8) = {})", -25.0 * 8.0_f64.sin())
        }
        other => println!("  unexpected: {other:?}"),
    }
    println!();

    // Example 4: variable exponents have no second-order rule
    println!("Example 4: f(x, y) = x^y");
    let at = Feed::new().bind(&x, 2.0).bind(&y, 3.0);
    match x.pow(&y).hessian(&at) {
        Ok(h) => println!("  {h:?}"),
        Err(e) => println!("  error: {e}"),
    }
}

fn report(f: &symdiff::Expr, at: &Feed) {
    println!("  f = {}", f.evaluate(at).expect("f is defined here"));
    let grad = f.gradient(at).expect("f is differentiable here");
    for (v, d) in grad.iter() {
        println!("  ∂f/∂{} = {d}", v.name().unwrap_or_else(|| "?".into()));
    }
    let h = f.hessian_table(at).expect("f has a Hessian");
    match h.to_array() {
        Ok(m) => println!("  H =\n{m:.3}"),
        Err(e) => println!("  H is not scalar: {e}"),
    }
    println!("  symmetric: {}\n", h.is_symmetric(1e-12));
}
