//! Capacity model error types.

use thiserror::Error;

use crate::ledger::AgentId;

/// Result type alias for capacity arithmetic.
pub type CapacityResult<T> = Result<T, CapacityError>;

/// Errors raised by vector and ledger arithmetic.
///
/// All of these indicate caller misuse or an inconsistent snapshot.
/// Running out of capacity is never one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("capacity would become negative: {minuend} - {subtrahend}")]
    NegativeCapacity {
        minuend: String,
        subtrahend: String,
    },

    #[error("invalid cpu amount: {0}")]
    InvalidCpu(String),
}
