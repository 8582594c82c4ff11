//! Fixed-step integration driver
//!
//! Advances an initial value problem from `initial_x` to `reach_point` by
//! repeatedly applying one step function with a constant step size, and
//! records every completed step.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::equation::{build_with, DerivativeFunction, EquationConvention};
use crate::error::SolverError;
use crate::stepper::{Method, OdeSystem, Sample};

/// Slack on the reach point that absorbs drift in the accumulated abscissa.
///
/// Summing `h` repeatedly rarely lands exactly on `reach_point`; without the
/// slack a run could take one extra, almost-zero-length step.
pub const REACH_TOLERANCE: f64 = 1e-10;

/// Complete description of one initial value problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemConfig {
    /// Order of the ODE, equal to the dimension of the state vector
    pub order: usize,
    /// Right-hand side of `y^(order) = ...`
    pub equation: String,
    /// Integration method
    pub method: Method,
    /// Initial abscissa
    pub initial_x: f64,
    /// Initial state `[y, y', ..., y^(order-1)]`
    pub initial_y: Vec<f64>,
    /// Abscissa to integrate to
    pub reach_point: f64,
    /// Fixed step size
    pub step_size: f64,
    /// Variable naming and evaluation-error policy
    #[serde(default)]
    pub convention: EquationConvention,
}

impl ProblemConfig {
    /// Check the numeric invariants of the configuration.
    ///
    /// A reach point at or before the initial abscissa is valid and simply
    /// yields an empty trajectory.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.order < 1 {
            return Err(invalid("order must be at least 1".to_string()));
        }
        if self.initial_y.len() != self.order {
            return Err(invalid(format!(
                "initialY has {} components but the order is {}",
                self.initial_y.len(),
                self.order
            )));
        }
        if !self.initial_x.is_finite() || !self.reach_point.is_finite() {
            return Err(invalid(
                "initialX and reachPoint must be finite".to_string(),
            ));
        }
        for (i, &val) in self.initial_y.iter().enumerate() {
            if !val.is_finite() {
                return Err(invalid(format!("initialY[{}] is not finite", i)));
            }
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(invalid(
                "stepSize must be positive and finite".to_string(),
            ));
        }
        if self.initial_x + self.step_size <= self.initial_x {
            return Err(invalid(format!(
                "stepSize {} does not advance initialX {}",
                self.step_size, self.initial_x
            )));
        }
        Ok(())
    }

    /// Number of steps a solve is expected to take.
    pub fn expected_steps(&self) -> usize {
        let span = self.reach_point - self.initial_x;
        if span <= REACH_TOLERANCE {
            0
        } else {
            (span / self.step_size).ceil() as usize
        }
    }
}

fn invalid(message: String) -> SolverError {
    SolverError::InvalidConfiguration(message)
}

/// Samples recorded by a solve, one per completed step, in step order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no step was recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded samples.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterate over recorded samples.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Abscissas of all samples.
    pub fn x_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.x).collect()
    }

    /// States of all samples.
    pub fn y_values(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.y.clone()).collect()
    }

    fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Final state and full trajectory of a successful solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOutput {
    /// Last `(x, y)` reached
    pub solution: Sample,
    /// Every completed step
    pub trajectory: Trajectory,
}

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Total number of derivative evaluations
    pub fn_evals: u64,
    /// Number of completed steps
    pub steps: u64,
}

/// Phase of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// More steps are needed to reach the target
    Running,
    /// The reach point was attained; the current sample is the solution
    Done,
}

/// Fixed-step integrator for one problem configuration.
///
/// # Example
/// ```
/// use ode_ivp::{Integrator, Method, ProblemConfig};
///
/// let config = ProblemConfig {
///     order: 1,
///     equation: "y[0]".to_string(),
///     method: Method::RungeKutta4,
///     initial_x: 0.0,
///     initial_y: vec![1.0],
///     reach_point: 1.0,
///     step_size: 0.01,
///     convention: Default::default(),
/// };
///
/// let mut integrator = Integrator::new(config).unwrap();
/// let solution = integrator.solve().unwrap();
/// assert!((solution.y[0] - std::f64::consts::E).abs() < 1e-8);
/// assert_eq!(integrator.trajectory().len(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct Integrator {
    config: ProblemConfig,
    derivative: DerivativeFunction,
    /// Maximum number of steps before a solve is aborted
    pub max_steps: Option<u64>,
    /// Maximum wall-clock time a solve may take
    pub max_duration: Option<Duration>,
    /// Integration statistics of the current or last solve
    pub stats: Stats,
    current: Sample,
    trajectory: Trajectory,
    state: DriverState,
    started: Instant,
}

impl Integrator {
    /// Validate `config` and compile its equation.
    pub fn new(config: ProblemConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let derivative = build_with(&config.equation, config.order, config.convention)?;
        Self::with_derivative(config, derivative)
    }

    /// Use an already built derivative, e.g. one shared between threads.
    ///
    /// The equation text of `config` is not compiled again.
    pub fn with_derivative(
        config: ProblemConfig,
        derivative: DerivativeFunction,
    ) -> Result<Self, SolverError> {
        config.validate()?;
        if derivative.dim() != config.order {
            return Err(invalid(format!(
                "derivative of dimension {} does not match order {}",
                derivative.dim(),
                config.order
            )));
        }

        let current = Sample {
            x: config.initial_x,
            y: config.initial_y.clone(),
        };
        Ok(Self {
            config,
            derivative,
            max_steps: None,
            max_duration: None,
            stats: Stats::default(),
            current,
            trajectory: Trajectory::default(),
            state: DriverState::Running,
            started: Instant::now(),
        })
    }

    /// Limit the number of steps a solve may take.
    pub fn set_step_budget(&mut self, max_steps: u64) {
        self.max_steps = Some(max_steps);
    }

    /// Limit the wall-clock time a solve may take.
    pub fn set_time_budget(&mut self, max_duration: Duration) {
        self.max_duration = Some(max_duration);
    }

    /// Configuration being solved.
    pub fn config(&self) -> &ProblemConfig {
        &self.config
    }

    /// The compiled right-hand side.
    pub fn derivative(&self) -> &DerivativeFunction {
        &self.derivative
    }

    /// Current phase.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Latest `(x, y)`: the initial point before any step, the solution
    /// once [`DriverState::Done`].
    pub fn current(&self) -> &Sample {
        &self.current
    }

    /// Steps recorded so far. After a failed solve this holds every step
    /// completed before the failure.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Consume the integrator, keeping its trajectory.
    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Return to the initial point and drop the recorded trajectory.
    pub fn reset(&mut self) {
        self.current = Sample {
            x: self.config.initial_x,
            y: self.config.initial_y.clone(),
        };
        self.trajectory.clear();
        self.stats = Stats::default();
        self.state = DriverState::Running;
        self.started = Instant::now();
    }

    /// Take one step if the reach point has not been attained yet.
    ///
    /// Returns `Ok(false)` once the driver is [`DriverState::Done`]. A failing
    /// step leaves the current point and the trajectory untouched.
    pub fn advance(&mut self) -> Result<bool, SolverError> {
        if self.state == DriverState::Done {
            return Ok(false);
        }
        if self.current.x >= self.config.reach_point - REACH_TOLERANCE {
            self.state = DriverState::Done;
            return Ok(false);
        }
        self.check_budget()?;

        let step = self.config.method.stepper();
        let next = step(
            &self.derivative,
            self.current.x,
            &self.current.y,
            self.config.step_size,
        )?;
        if next.x <= self.current.x {
            return Err(invalid(format!(
                "stepSize {} no longer advances x = {}",
                self.config.step_size, self.current.x
            )));
        }

        self.stats.steps += 1;
        self.stats.fn_evals += self.config.method.stages() as u64;
        if self.stats.steps % 1000 == 0 {
            log::trace!(
                "{} steps, x = {:.6e} of {:.6e}",
                self.stats.steps,
                next.x,
                self.config.reach_point
            );
        }

        self.current = next.clone();
        self.trajectory.push(next);
        Ok(true)
    }

    /// Integrate from the initial point to the reach point.
    ///
    /// Any previous trajectory is discarded first. A reach point at or before
    /// the initial abscissa returns the initial point with no steps.
    ///
    /// # Returns
    /// * `Ok(solution)` - the final `(x, y)`
    /// * `Err(SolverError)` - the first failure; completed steps remain in
    ///   [`trajectory`](Self::trajectory)
    pub fn solve(&mut self) -> Result<Sample, SolverError> {
        self.reset();
        log::debug!(
            "solving `{}` with {} from x = {} to {} (h = {})",
            self.config.equation,
            self.config.method,
            self.config.initial_x,
            self.config.reach_point,
            self.config.step_size
        );

        while self.advance()? {}

        log::debug!(
            "solve finished at x = {} after {} steps ({} evaluations)",
            self.current.x,
            self.stats.steps,
            self.stats.fn_evals
        );
        Ok(self.current.clone())
    }

    fn check_budget(&self) -> Result<(), SolverError> {
        let steps_exhausted = self.max_steps.is_some_and(|max| self.stats.steps >= max);
        let time_exhausted = self
            .max_duration
            .is_some_and(|max| self.started.elapsed() >= max);

        if steps_exhausted || time_exhausted {
            log::warn!(
                "aborting solve of `{}` at x = {} after {} steps",
                self.config.equation,
                self.current.x,
                self.stats.steps
            );
            return Err(SolverError::StepBudgetExceeded {
                steps: self.stats.steps,
                x: self.current.x,
            });
        }
        Ok(())
    }
}

/// Solve `config` and return the solution with its trajectory.
pub fn solve(config: &ProblemConfig) -> Result<SolveOutput, SolverError> {
    let mut integrator = Integrator::new(config.clone())?;
    let solution = integrator.solve()?;
    Ok(SolveOutput {
        solution,
        trajectory: integrator.into_trajectory(),
    })
}
