//! Placement error types.

use elastic_capacity::CapacityError;
use thiserror::Error;

/// Errors that can occur while solving or reconciling a placement.
///
/// Capacity shortfall is not an error; it shows up as a smaller or empty
/// delta in the returned outcome.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] anyhow::Error),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
