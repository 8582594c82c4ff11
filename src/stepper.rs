//! Single-step explicit integration formulas.
//!
//! All five methods run through one explicit Runge-Kutta stage engine,
//! parameterized by the tables in [`coefficients`](crate::coefficients).
//! A step is a pure function of `(f, x0, y0, h)`: no workspace is kept
//! between calls and the step size is never adapted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coefficients::{Tableau, DORMAND_PRINCE, EULER, HEUN, MIDPOINT, RUNGE_KUTTA4};
use crate::error::SolverError;
use crate::vector::{add, scale};

/// System of first-order ordinary differential equations: dy/dx = f(x, y)
pub trait OdeSystem {
    /// Dimension of the state vector
    fn dim(&self) -> usize;

    /// Evaluate the right-hand side of the system
    ///
    /// # Arguments
    /// * `x` - Current abscissa
    /// * `y` - Current state vector
    fn rhs(&self, x: f64, y: &[f64]) -> Result<Vec<f64>, SolverError>;
}

/// A point `(x, y)` on a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Abscissa
    pub x: f64,
    /// State vector at `x`
    pub y: Vec<f64>,
}

/// Signature shared by every stepper.
pub type StepFn = fn(&dyn OdeSystem, f64, &[f64], f64) -> Result<Sample, SolverError>;

/// The closed set of fixed-step integration methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    /// Forward Euler, first order
    Euler,
    /// Explicit midpoint, second order
    Midpoint,
    /// Heun's improved Euler, second order
    Heun,
    /// Classical Runge-Kutta, fourth order
    #[serde(rename = "rungeKutta", alias = "rk4")]
    RungeKutta4,
    /// Dormand-Prince 5th-order formula used at a fixed step
    #[serde(rename = "dormandPrince", alias = "dopri5")]
    DormandPrince,
}

impl Method {
    /// Every method, in order of increasing cost.
    pub const ALL: [Method; 5] = [
        Method::Euler,
        Method::Midpoint,
        Method::Heun,
        Method::RungeKutta4,
        Method::DormandPrince,
    ];

    /// Step function implementing this method.
    pub fn stepper(self) -> StepFn {
        match self {
            Method::Euler => euler,
            Method::Midpoint => midpoint,
            Method::Heun => heun,
            Method::RungeKutta4 => runge_kutta4,
            Method::DormandPrince => dormand_prince,
        }
    }

    /// Butcher tableau of this method.
    pub fn tableau(self) -> Tableau {
        match self {
            Method::Euler => EULER,
            Method::Midpoint => MIDPOINT,
            Method::Heun => HEUN,
            Method::RungeKutta4 => RUNGE_KUTTA4,
            Method::DormandPrince => DORMAND_PRINCE,
        }
    }

    /// Derivative evaluations per step.
    pub fn stages(self) -> usize {
        self.tableau().stages()
    }

    /// Global order of accuracy.
    pub fn order(self) -> u8 {
        match self {
            Method::Euler => 1,
            Method::Midpoint | Method::Heun => 2,
            Method::RungeKutta4 => 4,
            Method::DormandPrince => 5,
        }
    }

    /// Name used in requests and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Method::Euler => "euler",
            Method::Midpoint => "midpoint",
            Method::Heun => "heun",
            Method::RungeKutta4 => "rungeKutta",
            Method::DormandPrince => "dormandPrince",
        }
    }
}

impl FromStr for Method {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "euler" => Ok(Method::Euler),
            "midpoint" => Ok(Method::Midpoint),
            "heun" => Ok(Method::Heun),
            "rungeKutta" | "rk4" | "runge_kutta4" => Ok(Method::RungeKutta4),
            "dormandPrince" | "dopri5" | "dormand_prince" => Ok(Method::DormandPrince),
            other => Err(SolverError::InvalidConfiguration(format!(
                "invalid method value: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Forward Euler step.
pub fn euler(sys: &dyn OdeSystem, x0: f64, y0: &[f64], h: f64) -> Result<Sample, SolverError> {
    explicit_rk(&EULER, sys, x0, y0, h)
}

/// Explicit midpoint step.
pub fn midpoint(sys: &dyn OdeSystem, x0: f64, y0: &[f64], h: f64) -> Result<Sample, SolverError> {
    explicit_rk(&MIDPOINT, sys, x0, y0, h)
}

/// Heun (trapezoidal predictor-corrector) step.
pub fn heun(sys: &dyn OdeSystem, x0: f64, y0: &[f64], h: f64) -> Result<Sample, SolverError> {
    explicit_rk(&HEUN, sys, x0, y0, h)
}

/// Classical fourth-order Runge-Kutta step.
pub fn runge_kutta4(
    sys: &dyn OdeSystem,
    x0: f64,
    y0: &[f64],
    h: f64,
) -> Result<Sample, SolverError> {
    explicit_rk(&RUNGE_KUTTA4, sys, x0, y0, h)
}

/// Dormand-Prince 5th-order step, without the embedded error estimate.
pub fn dormand_prince(
    sys: &dyn OdeSystem,
    x0: f64,
    y0: &[f64],
    h: f64,
) -> Result<Sample, SolverError> {
    explicit_rk(&DORMAND_PRINCE, sys, x0, y0, h)
}

/// Advance `(x0, y0)` by `h` with an arbitrary explicit tableau.
///
/// Computes all stages, then forms `y0 + h * sum b_i k_i`. The first failing
/// derivative evaluation aborts the step.
pub fn explicit_rk(
    tableau: &Tableau,
    sys: &dyn OdeSystem,
    x0: f64,
    y0: &[f64],
    h: f64,
) -> Result<Sample, SolverError> {
    if sys.dim() != y0.len() {
        return Err(SolverError::InvalidConfiguration(format!(
            "system of dimension {} stepped with a state of length {}",
            sys.dim(),
            y0.len()
        )));
    }

    let mut k: Vec<Vec<f64>> = Vec::with_capacity(tableau.stages());
    for (row, &c) in tableau.a.iter().zip(tableau.c) {
        // y_temp = y0 + h * sum_{j<i} a_ij * k_j
        let mut y_temp = y0.to_vec();
        for (&a_ij, k_j) in row.iter().zip(&k) {
            if a_ij != 0.0 {
                y_temp = add(&y_temp, &scale(h * a_ij, k_j));
            }
        }

        let k_i = sys.rhs(x0 + c * h, &y_temp)?;
        if k_i.len() != y0.len() {
            return Err(SolverError::InvalidConfiguration(format!(
                "derivative returned {} components for a state of length {}",
                k_i.len(),
                y0.len()
            )));
        }
        k.push(k_i);
    }

    let mut y1 = y0.to_vec();
    for (&b_i, k_i) in tableau.b.iter().zip(&k) {
        if b_i != 0.0 {
            y1 = add(&y1, &scale(h * b_i, k_i));
        }
    }

    Ok(Sample { x: x0 + h, y: y1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::{build, DerivativeFunction};
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn growth() -> DerivativeFunction {
        DerivativeFunction::from_fn(1, |_x, y| Ok(vec![y[0]]))
    }

    #[test]
    fn test_single_step_values() {
        let f = growth();
        let h: f64 = 0.1;
        let expected = [
            (Method::Euler, 1.1),
            (Method::Midpoint, 1.105),
            (Method::Heun, 1.105),
            (Method::RungeKutta4, 1.0 + h + h * h / 2.0 + h.powi(3) / 6.0 + h.powi(4) / 24.0),
        ];
        for (method, value) in expected {
            let step = (method.stepper())(&f, 0.0, &[1.0], h).unwrap();
            assert_relative_eq!(step.x, 0.1);
            assert_relative_eq!(step.y[0], value, max_relative = 1e-14);
        }

        let step = dormand_prince(&f, 0.0, &[1.0], h).unwrap();
        assert!((step.y[0] - h.exp()).abs() < 1e-8, "dopri5: {}", step.y[0]);
    }

    #[test]
    fn test_x_advances_by_h() {
        let f = growth();
        for method in Method::ALL {
            let step = (method.stepper())(&f, 1.25, &[2.0], 0.5).unwrap();
            assert_eq!(step.x, 1.75, "{}", method);
        }
    }

    #[test]
    fn test_steps_are_pure() {
        let f = build("sin(x) * y[1] - y[0]", 2).unwrap();
        for method in Method::ALL {
            let a = (method.stepper())(&f, 0.3, &[1.0, -0.5], 0.07).unwrap();
            let b = (method.stepper())(&f, 0.3, &[1.0, -0.5], 0.07).unwrap();
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            for (ya, yb) in a.y.iter().zip(&b.y) {
                assert_eq!(ya.to_bits(), yb.to_bits(), "{}", method);
            }
        }
    }

    #[test]
    fn test_evaluation_counts() {
        for method in Method::ALL {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let f = DerivativeFunction::from_fn(1, move |_x, y| {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(vec![-y[0]])
            });
            (method.stepper())(&f, 0.0, &[1.0], 0.1).unwrap();
            assert_eq!(calls.load(Ordering::Relaxed), method.stages(), "{}", method);
        }
    }

    #[test]
    fn test_local_error_order() {
        // One step of y' = y from y(0) = 1. The local error of an order-p
        // method is O(h^(p+1)), so halving h divides it by about 2^(p+1).
        let f = growth();
        for method in Method::ALL {
            let err = |h: f64| {
                let step = (method.stepper())(&f, 0.0, &[1.0], h).unwrap();
                (step.y[0] - h.exp()).abs()
            };
            let ratio = err(0.1) / err(0.05);
            let expected = 2f64.powi(method.order() as i32 + 1);
            assert!(
                ratio > 0.8 * expected && ratio < 1.25 * expected,
                "{}: error ratio {} (expected about {})",
                method,
                ratio,
                expected
            );
        }
    }

    #[test]
    fn test_failure_propagates() {
        let f = build("1/x", 1).unwrap();
        for method in Method::ALL {
            let err = (method.stepper())(&f, 0.0, &[1.0], 0.1).unwrap_err();
            assert_eq!(err, SolverError::DivisionByZero { x: 0.0 });
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let f = growth();
        let err = euler(&f, 0.0, &[1.0, 2.0], 0.1).unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfiguration(_)));

        let bad = DerivativeFunction::from_fn(1, |_x, _y| Ok(vec![1.0, 2.0]));
        let err = heun(&bad, 0.0, &[1.0], 0.1).unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_method_names() {
        for method in Method::ALL {
            assert_eq!(method.name().parse::<Method>().unwrap(), method);
        }
        assert_eq!("rk4".parse::<Method>().unwrap(), Method::RungeKutta4);
        assert_eq!("dopri5".parse::<Method>().unwrap(), Method::DormandPrince);

        let err = "simpson".parse::<Method>().unwrap_err();
        assert_eq!(
            err,
            SolverError::InvalidConfiguration("invalid method value: simpson".into())
        );
    }

    #[test]
    fn test_method_serde_names() {
        let json = serde_json::to_string(&Method::RungeKutta4).unwrap();
        assert_eq!(json, "\"rungeKutta\"");
        let method: Method = serde_json::from_str("\"dormandPrince\"").unwrap();
        assert_eq!(method, Method::DormandPrince);
        assert!(serde_json::from_str::<Method>("\"simpson\"").is_err());
    }
}
