//! elastic-capacity: the capacity model for elastic placement.
//!
//! Resource quantities along two axes: CPU cores as an exact fraction and
//! memory as whole megabytes. Vectors and ledgers are immutable values;
//! every operation returns a new instance, so they can be shared freely
//! across threads.
//!
//! # Components
//!
//! - **`cpu`**: `CpuCores`, exact non-negative fractional cores
//! - **`vector`**: `CapacityVector` arithmetic and comparisons
//! - **`ledger`**: `CapacityLedger`, per-agent capacity maps

pub mod cpu;
pub mod error;
pub mod ledger;
pub mod vector;

pub use cpu::CpuCores;
pub use error::{CapacityError, CapacityResult};
pub use ledger::{AgentId, CapacityLedger};
pub use vector::CapacityVector;
