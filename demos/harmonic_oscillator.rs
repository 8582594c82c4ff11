//! Harmonic oscillator written as text.
//!
//! Integrates y'' + ω²y = 0 for one period with every method and compares
//! with the exact solution.
//!
//! Run with:
//!   cargo run --example harmonic_oscillator

use ode_ivp::{Integrator, Method, ProblemConfig};

fn main() {
    let omega: f64 = 2.0;
    let period = 2.0 * std::f64::consts::PI / omega;

    println!("Harmonic Oscillator (ω = {omega}, h = 0.01)");
    println!();

    for method in Method::ALL {
        let config = ProblemConfig {
            order: 2,
            equation: format!("-{} * y[0]", omega * omega),
            method,
            initial_x: 0.0,
            initial_y: vec![1.0, 0.0], // y(0) = 1, y'(0) = 0
            reach_point: period,
            step_size: 0.01,
            convention: Default::default(),
        };

        let mut integrator = Integrator::new(config).unwrap();
        let end = integrator.solve().unwrap();

        // Exact solution: y(x) = cos(ωx), y'(x) = -ω sin(ωx)
        let y_exact = (omega * end.x).cos();
        let v_exact = -omega * (omega * end.x).sin();

        println!("  {:<14} x = {:.6}", method.name(), end.x);
        println!("    y  = {:.15}   (error {:.2e})", end.y[0], (end.y[0] - y_exact).abs());
        println!("    y' = {:.15}   (error {:.2e})", end.y[1], (end.y[1] - v_exact).abs());
        println!(
            "    steps: {}, function evals: {}",
            integrator.stats.steps, integrator.stats.fn_evals
        );
    }
}
