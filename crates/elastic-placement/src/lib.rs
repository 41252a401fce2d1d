//! elastic-placement: bin-packing placement for elastic workloads.
//!
//! This crate decides *where* a workload grows or shrinks and *by how much*.
//! It does not start or stop containers itself; the control loop applies the
//! returned deltas through a [`ContainerLifecycleManager`] and re-solves from
//! a fresh snapshot on the next iteration.
//!
//! # Components
//!
//! - **`policy`**: Per-workload quantum, memory ceiling and agent floor
//! - **`ranking`**: Tightest-fit candidate ordering
//! - **`solver`**: Placement solver (agent count, capacity, scale-in)
//! - **`snapshot`**: TOML-loadable cluster snapshots
//! - **`executor`**: Control-loop seams and the reconcile step

pub mod error;
pub mod executor;
pub mod policy;
pub mod ranking;
pub mod snapshot;
pub mod solver;

pub use error::{PlacementError, PlacementResult};
pub use executor::{
    ClusterStateProvider, CommandKind, ContainerLifecycleManager, Demand, LifecycleCommand,
    RecordingLifecycle, ReconcileReport, reconcile_once,
};
pub use policy::WorkloadPolicy;
pub use ranking::{Candidate, rank_tightest_fit};
pub use snapshot::ClusterSnapshot;
pub use solver::{PlacementOutcome, PlacementSolver};
