//! In-memory cluster snapshots loaded from TOML.
//!
//! A snapshot bundles a workload's policy, its current footprint and the
//! free capacity reported by each agent. It can seed a [`PlacementSolver`]
//! directly or stand in for the cluster state provider in a control loop.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use elastic_capacity::CapacityLedger;

use crate::error::{PlacementError, PlacementResult};
use crate::executor::ClusterStateProvider;
use crate::policy::WorkloadPolicy;
use crate::solver::{PlacementOutcome, PlacementSolver};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub policy: WorkloadPolicy,
    #[serde(default)]
    pub footprint: CapacityLedger,
    #[serde(default)]
    pub free: CapacityLedger,
}

impl ClusterSnapshot {
    pub fn from_toml_str(content: &str) -> PlacementResult<Self> {
        let snapshot: ClusterSnapshot =
            toml::from_str(content).map_err(|e| PlacementError::Snapshot(e.to_string()))?;
        snapshot.policy.validate()?;
        Ok(snapshot)
    }

    pub fn from_file(path: &Path) -> PlacementResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlacementError::Snapshot(format!("read {}: {e}", path.display())))?;
        let snapshot = Self::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            agents = snapshot.free.len(),
            hosting = snapshot.footprint.hosting_agents().len(),
            "loaded cluster snapshot"
        );
        Ok(snapshot)
    }

    pub fn to_toml_string(&self) -> PlacementResult<String> {
        toml::to_string_pretty(self).map_err(|e| PlacementError::Snapshot(e.to_string()))
    }

    pub fn solver(&self) -> PlacementSolver {
        PlacementSolver::new(self.policy.clone())
            .with_current_footprint(self.footprint.clone())
            .with_free_capacity(self.free.clone())
    }

    /// The snapshot expected after `outcome` has been applied in full.
    ///
    /// Deallocated capacity returns to the agents' free pool; allocated
    /// capacity leaves it.
    pub fn fold(&self, outcome: &PlacementOutcome) -> PlacementResult<ClusterSnapshot> {
        let footprint = outcome.apply_to(&self.footprint)?;
        let free = self
            .free
            .add_ledger(outcome.deallocation_delta())
            .subtract_ledger(outcome.allocation_delta())?;
        Ok(ClusterSnapshot {
            policy: self.policy.clone(),
            footprint,
            free,
        })
    }
}

impl ClusterStateProvider for ClusterSnapshot {
    fn free_capacity(&self) -> anyhow::Result<CapacityLedger> {
        Ok(self.free.clone())
    }

    fn footprint(&self, _workload: &str) -> anyhow::Result<CapacityLedger> {
        Ok(self.footprint.clone())
    }
}
