//! Simulator error types.

use blocksim_network::RateError;
use blocksim_simulation::{SchedulerError, WorldError};
use thiserror::Error;

/// Errors from building or running a scenario.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The configuration cannot be turned into a world.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("World error: {0}")]
    World(#[from] WorldError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid data rate: {0}")]
    Rate(#[from] RateError),

    /// The report could not be serialized.
    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}
