//! Convergence of the fixed-step methods on y' = y.
//!
//! Halves the step size repeatedly and prints the error at x = 1 together
//! with the observed order, log2(err(h) / err(h/2)).
//!
//! Run with:
//!   cargo run --example exponential_growth

use std::f64::consts::E;

use ode_ivp::{solve, Method, ProblemConfig};

fn main() {
    let steps = [0.1, 0.05, 0.025, 0.0125];

    for method in Method::ALL {
        println!("{} (order {})", method.name(), method.order());

        let mut previous: Option<f64> = None;
        for h in steps {
            let config = ProblemConfig {
                order: 1,
                equation: "y[0]".to_string(),
                method,
                initial_x: 0.0,
                initial_y: vec![1.0],
                reach_point: 1.0,
                step_size: h,
                convention: Default::default(),
            };
            let output = solve(&config).unwrap();
            let error = (output.solution.y[0] - E).abs();

            match previous {
                Some(p) => println!("  h = {h:<7} error = {error:.3e}   observed order {:.2}", (p / error).log2()),
                None => println!("  h = {h:<7} error = {error:.3e}"),
            }
            previous = Some(error);
        }
        println!();
    }
}
