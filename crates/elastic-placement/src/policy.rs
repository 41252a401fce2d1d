//! Per-workload placement policy.

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// Scalar constraints applied to every solve for one workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadPolicy {
    /// Memory reserved by each placement (container), in MB.
    pub placement_quantum_mb: u64,
    /// Ceiling on the workload's memory across the cluster, in MB.
    /// `0` means no more memory may be added.
    #[serde(default = "unlimited_memory", skip_serializing_if = "is_unlimited")]
    pub max_total_memory_mb: u64,
    /// Minimum number of distinct agents hosting the workload.
    #[serde(default = "default_min_agent_count")]
    pub min_agent_count: usize,
}

fn unlimited_memory() -> u64 {
    u64::MAX
}

fn is_unlimited(max_total_memory_mb: &u64) -> bool {
    *max_total_memory_mb == u64::MAX
}

fn default_min_agent_count() -> usize {
    1
}

impl WorkloadPolicy {
    pub fn new(placement_quantum_mb: u64) -> Self {
        Self {
            placement_quantum_mb,
            max_total_memory_mb: unlimited_memory(),
            min_agent_count: default_min_agent_count(),
        }
    }

    pub fn with_max_total_memory_mb(mut self, max_total_memory_mb: u64) -> Self {
        self.max_total_memory_mb = max_total_memory_mb;
        self
    }

    pub fn with_min_agent_count(mut self, min_agent_count: usize) -> Self {
        self.min_agent_count = min_agent_count;
        self
    }

    pub fn validate(&self) -> PlacementResult<()> {
        if self.placement_quantum_mb == 0 {
            return Err(PlacementError::InvalidConfig(
                "placement_quantum_mb must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
