//! # ode-ivp: Fixed-Step Solver for Textual ODEs
//!
//! Solves initial value problems for scalar ODEs of any order, written as a
//! plain-text right-hand side:
//!
//! ```text
//! y^(n) = g(x, y, y', ..., y^(n-1)),   y(x0) = [y0, ..., y_{n-1}]
//! ```
//!
//! ## Features
//!
//! - Equations compiled once from text (`-y[0] + sin(x)`) into an immutable,
//!   thread-safe derivative function
//! - Companion-form reduction of order-`n` equations to first-order systems
//! - Five explicit fixed-step methods: Euler, midpoint, Heun, classical
//!   Runge-Kutta 4 and the 5th-order Dormand-Prince formula
//! - Full trajectory recording with optional step and time budgets
//! - Typed errors for division by zero, NaN results and bad configurations
//!
//! ## Basic Usage
//!
//! ```rust
//! use ode_ivp::{solve, Method, ProblemConfig};
//!
//! // y'' = -y, y(0) = 1, y'(0) = 0: a harmonic oscillator
//! let config = ProblemConfig {
//!     order: 2,
//!     equation: "-y[0]".to_string(),
//!     method: Method::DormandPrince,
//!     initial_x: 0.0,
//!     initial_y: vec![1.0, 0.0],
//!     reach_point: 1.0,
//!     step_size: 0.1,
//!     convention: Default::default(),
//! };
//!
//! let output = solve(&config).unwrap();
//! assert_eq!(output.trajectory.len(), 10);
//! assert!((output.solution.y[0] - 1.0_f64.cos()).abs() < 1e-7);
//! ```
//!
//! ## Equations
//!
//! The state of an order-`n` problem is `[y, y', ..., y^(n-1)]`, referenced
//! as `y[0] .. y[n-1]` (or `y0 .. y{n-1}`) next to the abscissa `x`. The
//! usual arithmetic operators, `^` for powers, the constants `pi` and `e`,
//! and common functions (`sin`, `ln`, `sqrt`, `atan2`, ...) are available.
//! See [`equation`] for the full list and for the legacy `x, y, z` naming.
//!
//! Derivative functions can also be written in Rust and stepped directly:
//!
//! ```rust
//! use ode_ivp::{stepper, DerivativeFunction};
//!
//! let f = DerivativeFunction::from_fn(1, |_x, y| Ok(vec![-2.0 * y[0]]));
//! let next = stepper::runge_kutta4(&f, 0.0, &[1.0], 0.01).unwrap();
//! assert!((next.y[0] - (-0.02_f64).exp()).abs() < 1e-10);
//! ```
//!
//! ## Choosing a Method
//!
//! | Method | Order | Evaluations per step |
//! |---|---|---|
//! | Euler | 1 | 1 |
//! | Midpoint | 2 | 2 |
//! | Heun | 2 | 2 |
//! | Runge-Kutta 4 | 4 | 4 |
//! | Dormand-Prince | 5 | 6 |
//!
//! The step size is never adapted. Dormand-Prince is used for its 5th-order
//! weights only; the embedded 4th-order error estimate is not computed.
//!
//! ## References
//!
//! 1. Dormand, J.R. & Prince, P.J. (1980). "A family of embedded
//!    Runge-Kutta formulae". Journal of Computational and Applied
//!    Mathematics 6(1), 19-26.
//!
//! 2. Hairer, E., Nørsett, S.P., & Wanner, G. (1993). "Solving
//!    Ordinary Differential Equations I: Nonstiff Problems".
//!    Springer.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod coefficients;
pub mod equation;
pub mod error;
pub mod service;
pub mod solver;
pub mod stepper;
pub mod vector;

pub use equation::{build, build_with, CompiledEquation, DerivativeFunction, EquationConvention};
pub use error::SolverError;
pub use service::{
    process_application, ApplicationId, ApplicationStatus, ApplicationStore, InMemoryStore,
    SolutionResponse, SolverRequest,
};
pub use solver::{
    solve, DriverState, Integrator, ProblemConfig, SolveOutput, Stats, Trajectory,
    REACH_TOLERANCE,
};
pub use stepper::{Method, OdeSystem, Sample, StepFn};
