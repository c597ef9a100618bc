//! Derivatives of one expression, computed three ways.
//!
//! Builds `f(x) = sin(x)·eˣ + x³` once and prints its value, its first
//! derivative, a symbolic derivative evaluated numerically, and the
//! first few higher-order derivatives from the Taylor engine.
//!
//! Run with: `cargo run --example derivative_table`

use symdiff::{Feed, Graph};

fn main() {
    println!("=== Derivatives of f(x) = sin(x)·eˣ + x³ ===\n");

    let g = Graph::new();
    let x = g.variable("x");
    let f = x.sin() * x.exp() + x.powf(3.0);
    println!("f = {f}");
    println!("graph holds {} nodes\n", g.len());

    for point in [0.0, 0.5, 1.0] {
        let at = Feed::new().bind(&x, point);
        let value = f.evaluate(&at).expect("f is defined everywhere");
        let first = f.derivative(&at).expect("f is differentiable");
        println!("At x = {point}:");
        println!("  f(x)  = {value}");
        println!("  f'(x) = {}", first.scalar().unwrap_or(f64::NAN));

        let df = f.symbolic_derivative(&x);
        let symbolic = df.evaluate(&at).expect("f' is defined everywhere");
        println!("  f'(x) = {symbolic} (symbolic)");

        for n in 2..=5 {
            let d = f.nth_derivative(n, point).expect("single variable");
            println!("  f^({n})(x) = {d}");
        }
        println!();
    }

    println!("Second derivative as an expression:");
    let d2 = f.symbolic_derivative_n(2).expect("single variable");
    println!("  f'' = {d2}");
    println!("  graph now holds {} nodes", g.len());
}
