//! Error taxonomy shared by the equation builder, the steppers and the driver.

use thiserror::Error;

/// Errors raised while building or solving an initial value problem.
///
/// Configuration errors are raised before any stepping happens. The
/// evaluation errors abort the solve in progress; samples recorded before
/// the failing step stay available on the [`Integrator`](crate::Integrator).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Bad order, unknown method, malformed equation or invalid numbers
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The equation references an identifier that is not a declared variable
    #[error("unknown variable `{name}` in equation")]
    UnknownVariable {
        /// Identifier as written after normalization
        name: String,
    },

    /// The equation calls a function that is not available
    #[error("unknown function `{name}` in equation")]
    UnknownFunction {
        /// Function name as written
        name: String,
    },

    /// Division (or modulo) by zero while evaluating the equation
    #[error("division by zero occurred at x = {x}")]
    DivisionByZero {
        /// Abscissa at which the derivative was requested
        x: f64,
    },

    /// Any other fault raised by the evaluator
    #[error("error evaluating equation `{equation}`: {message}")]
    EquationEvaluation {
        /// Equation source
        equation: String,
        /// Description of the fault
        message: String,
    },

    /// The equation evaluated to NaN
    #[error("result is NaN at x = {x}")]
    NumericallyInvalidResult {
        /// Abscissa at which the NaN was produced
        x: f64,
    },

    /// The configured step or time budget ran out before the reach point
    #[error("step budget exceeded after {steps} steps at x = {x}")]
    StepBudgetExceeded {
        /// Steps completed before aborting
        steps: u64,
        /// Abscissa reached
        x: f64,
    },
}

impl SolverError {
    /// True for errors raised before stepping starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SolverError::InvalidConfiguration(_)
                | SolverError::UnknownVariable { .. }
                | SolverError::UnknownFunction { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SolverError::DivisionByZero { x: 0.5 };
        assert_eq!(err.to_string(), "division by zero occurred at x = 0.5");

        let err = SolverError::UnknownVariable { name: "q".into() };
        assert_eq!(err.to_string(), "unknown variable `q` in equation");
    }

    #[test]
    fn test_configuration_classification() {
        assert!(SolverError::InvalidConfiguration("order".into()).is_configuration());
        assert!(SolverError::UnknownFunction { name: "foo".into() }.is_configuration());
        assert!(!SolverError::NumericallyInvalidResult { x: 1.0 }.is_configuration());
        assert!(!SolverError::StepBudgetExceeded { steps: 3, x: 0.3 }.is_configuration());
    }
}
