//! Boundary between the solver and the surrounding application.
//!
//! Requests arrive as [`SolverRequest`] payloads, every request becomes an
//! *application* tracked by an [`ApplicationStore`], and the result is
//! stored as a serialized [`SolutionResponse`]. The lifecycle of an
//! application is
//!
//! ```text
//! new -> in_progress -> completed
//!                    \-> error
//! ```
//!
//! Storage format and transport are the store's business; this module only
//! moves opaque JSON strings across the boundary.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::equation::EquationConvention;
use crate::error::SolverError;
use crate::solver::{solve, ProblemConfig, SolveOutput};
use crate::stepper::Method;

/// Opaque identifier of a stored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Stored, not picked up yet
    New,
    /// Being solved
    InProgress,
    /// Solved; results are stored
    Completed,
    /// Solving failed
    Error,
}

impl ApplicationStatus {
    /// Whether moving from `self` to `next` follows the lifecycle.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::New, ApplicationStatus::InProgress)
                | (ApplicationStatus::InProgress, ApplicationStatus::Completed)
                | (ApplicationStatus::InProgress, ApplicationStatus::Error)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplicationStatus::New => "new",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Incoming solve request.
///
/// `userEquation` is the equation as the user typed it and is only kept for
/// display; `formattedEquation` is the right-hand side that gets compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverRequest {
    /// Method name, e.g. `rungeKutta`
    pub method: String,
    /// Order of the ODE
    pub order: usize,
    /// Equation as entered by the user
    #[serde(default)]
    pub user_equation: Option<String>,
    /// Right-hand side in solver syntax
    pub formatted_equation: String,
    /// Initial abscissa
    pub initial_x: f64,
    /// Initial state
    pub initial_y: Vec<f64>,
    /// Abscissa to integrate to
    pub reach_point: f64,
    /// Fixed step size
    pub step_size: f64,
    /// Variable naming of `formattedEquation`, `indexed` when absent
    #[serde(default)]
    pub convention: EquationConvention,
}

impl TryFrom<&SolverRequest> for ProblemConfig {
    type Error = SolverError;

    fn try_from(request: &SolverRequest) -> Result<Self, Self::Error> {
        let method: Method = request.method.parse()?;
        let config = ProblemConfig {
            order: request.order,
            equation: request.formatted_equation.clone(),
            method,
            initial_x: request.initial_x,
            initial_y: request.initial_y.clone(),
            reach_point: request.reach_point,
            step_size: request.step_size,
            convention: request.convention,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Result payload: the final point flattened as `[x, y0, y1, ...]` and the
/// trajectory split into abscissas and states.
///
/// JSON has no NaN or infinity: non-finite values are written as `null` and
/// read back as NaN, so the sign of an infinity does not survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionResponse {
    /// `[x, y0, y1, ...]` of the final point
    #[serde(deserialize_with = "nullable_values")]
    pub solution: Vec<f64>,
    /// Abscissa of every step
    #[serde(deserialize_with = "nullable_values")]
    pub x_values: Vec<f64>,
    /// State of every step
    #[serde(deserialize_with = "nullable_rows")]
    pub y_values: Vec<Vec<f64>>,
}

fn nullable_values<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn nullable_rows<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error> {
    let rows: Vec<Vec<Option<f64>>> = Vec::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        .collect())
}

impl From<&SolveOutput> for SolutionResponse {
    fn from(output: &SolveOutput) -> Self {
        let mut solution = Vec::with_capacity(output.solution.y.len() + 1);
        solution.push(output.solution.x);
        solution.extend_from_slice(&output.solution.y);
        Self {
            solution,
            x_values: output.trajectory.x_values(),
            y_values: output.trajectory.y_values(),
        }
    }
}

/// Errors reported by an [`ApplicationStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No application with this id
    #[error("application {0} not found")]
    UnknownApplication(ApplicationId),
    /// Status change that skips or reverses the lifecycle
    #[error("application {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Application
        id: ApplicationId,
        /// Current status
        from: ApplicationStatus,
        /// Requested status
        to: ApplicationStatus,
    },
    /// Backend-specific failure
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Errors of [`process_application`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The store rejected an operation
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The request or result could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence collaborator for applications and their results.
pub trait ApplicationStore {
    /// Store a serialized request for `user_id` with status `new`.
    fn create_application(&mut self, user_id: u64, request: &str)
        -> Result<ApplicationId, StoreError>;

    /// Move an application to `status`.
    fn set_status(&mut self, id: ApplicationId, status: ApplicationStatus)
        -> Result<(), StoreError>;

    /// Attach a serialized [`SolutionResponse`] to an application.
    fn save_results(&mut self, id: ApplicationId, results: &str) -> Result<(), StoreError>;
}

/// A stored application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    /// Owner
    pub user_id: u64,
    /// Serialized request
    pub request: String,
    /// Lifecycle status
    pub status: ApplicationStatus,
    /// Serialized results, once completed
    pub results: Option<String>,
}

/// [`ApplicationStore`] kept in memory, enforcing the lifecycle.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    next_id: u64,
    records: HashMap<ApplicationId, ApplicationRecord>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an application.
    pub fn get(&self, id: ApplicationId) -> Option<&ApplicationRecord> {
        self.records.get(&id)
    }

    /// Status of an application.
    pub fn status(&self, id: ApplicationId) -> Option<ApplicationStatus> {
        self.get(id).map(|record| record.status)
    }

    /// Stored results of an application.
    pub fn results(&self, id: ApplicationId) -> Option<&str> {
        self.get(id).and_then(|record| record.results.as_deref())
    }

    /// Ids of every application owned by `user_id`, oldest first.
    pub fn applications(&self, user_id: u64) -> Vec<ApplicationId> {
        let mut ids: Vec<ApplicationId> = self
            .records
            .iter()
            .filter(|(_, record)| record.user_id == user_id)
            .map(|(&id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    fn record_mut(&mut self, id: ApplicationId) -> Result<&mut ApplicationRecord, StoreError> {
        self.records
            .get_mut(&id)
            .ok_or(StoreError::UnknownApplication(id))
    }
}

impl ApplicationStore for InMemoryStore {
    fn create_application(
        &mut self,
        user_id: u64,
        request: &str,
    ) -> Result<ApplicationId, StoreError> {
        self.next_id += 1;
        let id = ApplicationId(self.next_id);
        self.records.insert(
            id,
            ApplicationRecord {
                user_id,
                request: request.to_string(),
                status: ApplicationStatus::New,
                results: None,
            },
        );
        Ok(id)
    }

    fn set_status(
        &mut self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), StoreError> {
        let record = self.record_mut(id)?;
        if !record.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        Ok(())
    }

    fn save_results(&mut self, id: ApplicationId, results: &str) -> Result<(), StoreError> {
        self.record_mut(id)?.results = Some(results.to_string());
        Ok(())
    }
}

/// Register `request` as an application of `user_id` and solve it.
///
/// Solver failures do not fail this call: they are logged and recorded as
/// status `error`. Store and serialization failures after the application
/// was created also set status `error` where the store still allows it, and
/// are then returned.
pub fn process_application<S: ApplicationStore>(
    store: &mut S,
    user_id: u64,
    request: &SolverRequest,
) -> Result<ApplicationId, ServiceError> {
    let id = store.create_application(user_id, &serde_json::to_string(request)?)?;
    log::debug!("created application {} for user {}", id, user_id);

    store.set_status(id, ApplicationStatus::InProgress)?;
    let outcome = ProblemConfig::try_from(request).and_then(|config| solve(&config));

    let output = match outcome {
        Ok(output) => output,
        Err(e) => {
            log::error!("error solving application {}: {}", id, e);
            store.set_status(id, ApplicationStatus::Error)?;
            return Ok(id);
        }
    };

    if let Err(e) = complete(store, id, &output) {
        log::error!("failed to store results of application {}: {}", id, e);
        store.set_status(id, ApplicationStatus::Error)?;
        return Err(e);
    }
    log::debug!(
        "application {} completed with {} steps",
        id,
        output.trajectory.len()
    );
    Ok(id)
}

fn complete<S: ApplicationStore>(
    store: &mut S,
    id: ApplicationId,
    output: &SolveOutput,
) -> Result<(), ServiceError> {
    let response = SolutionResponse::from(output);
    store.save_results(id, &serde_json::to_string(&response)?)?;
    store.set_status(id, ApplicationStatus::Completed)?;
    Ok(())
}
