//! Control-loop step: snapshot, solve, apply.
//!
//! The cluster state provider and the container lifecycle manager live
//! outside this crate; they are reached through the traits below. One call
//! to [`reconcile_once`] is one serialized iteration of the control loop for
//! one workload. Nothing is retried: a failed command aborts the iteration
//! and the next iteration starts from a fresh snapshot.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use elastic_capacity::{AgentId, CapacityLedger, CapacityVector};

use crate::error::{PlacementError, PlacementResult};
use crate::policy::WorkloadPolicy;
use crate::solver::{PlacementOutcome, PlacementSolver};

/// Supplies the solver's inputs.
pub trait ClusterStateProvider {
    /// Free capacity per agent, as last reported by heartbeats.
    fn free_capacity(&self) -> anyhow::Result<CapacityLedger>;

    /// The authoritative footprint of `workload`.
    fn footprint(&self, workload: &str) -> anyhow::Result<CapacityLedger>;
}

/// Starts and stops containers on agents.
pub trait ContainerLifecycleManager {
    fn start(
        &mut self,
        workload: &str,
        agent: &str,
        capacity: &CapacityVector,
    ) -> anyhow::Result<()>;

    fn stop(
        &mut self,
        workload: &str,
        agent: &str,
        capacity: &CapacityVector,
    ) -> anyhow::Result<()>;
}

/// What the control loop is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Demand {
    /// Spread onto at least this many agents.
    AgentCount { count: usize },
    /// Grow by this much CPU and memory.
    Capacity { capacity: CapacityVector },
    /// Shrink by this much CPU and memory.
    Release { capacity: CapacityVector },
}

impl Demand {
    pub fn solve(&self, solver: &PlacementSolver) -> PlacementResult<PlacementOutcome> {
        match self {
            Demand::AgentCount { count } => solver.solve_by_agent_count(*count),
            Demand::Capacity { capacity } => solver.solve_by_capacity(capacity),
            Demand::Release { capacity } => solver.solve_scale_in(capacity),
        }
    }
}

/// Result of one reconcile iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub workload: String,
    pub outcome: PlacementOutcome,
    pub stopped: usize,
    pub started: usize,
    /// Footprint expected once every command has taken effect.
    pub next_footprint: CapacityLedger,
}

/// Runs one snapshot → solve → apply iteration for `workload`.
///
/// Every stop from the deallocation delta is issued before any start from
/// the allocation delta.
pub fn reconcile_once<P, L>(
    provider: &P,
    lifecycle: &mut L,
    workload: &str,
    policy: &WorkloadPolicy,
    demand: &Demand,
) -> PlacementResult<ReconcileReport>
where
    P: ClusterStateProvider + ?Sized,
    L: ContainerLifecycleManager + ?Sized,
{
    let free = provider
        .free_capacity()
        .map_err(|e| PlacementError::Snapshot(format!("free capacity: {e:#}")))?;
    let footprint = provider
        .footprint(workload)
        .map_err(|e| PlacementError::Snapshot(format!("footprint of {workload}: {e:#}")))?;

    let solver = PlacementSolver::new(policy.clone())
        .with_current_footprint(footprint.clone())
        .with_free_capacity(free);
    let outcome = demand.solve(&solver)?;

    if outcome.is_empty() {
        debug!(workload, "no placement change required");
    }

    let mut stopped = 0;
    for (agent, capacity) in outcome.deallocation_delta() {
        lifecycle.stop(workload, agent, capacity).inspect_err(|e| {
            warn!(workload, agent = %agent, error = %e, "stop failed, aborting iteration");
        })?;
        stopped += 1;
    }

    let mut started = 0;
    for (agent, capacity) in outcome.allocation_delta() {
        lifecycle.start(workload, agent, capacity).inspect_err(|e| {
            warn!(workload, agent = %agent, error = %e, "start failed, aborting iteration");
        })?;
        started += 1;
    }

    let next_footprint = outcome.apply_to(&footprint)?;
    info!(workload, stopped, started, "reconciled placement");

    Ok(ReconcileReport {
        workload: workload.to_string(),
        outcome,
        stopped,
        started,
        next_footprint,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Start,
    Stop,
}

/// A lifecycle command as issued by the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCommand {
    pub kind: CommandKind,
    pub workload: String,
    pub agent: AgentId,
    pub capacity: CapacityVector,
}

/// Lifecycle manager that only records the commands it receives.
///
/// Used for dry runs; `fail_on` makes commands for one agent fail.
#[derive(Debug, Default)]
pub struct RecordingLifecycle {
    pub commands: Vec<LifecycleCommand>,
    pub fail_on: Option<AgentId>,
}

impl RecordingLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(agent: &str) -> Self {
        Self {
            commands: Vec::new(),
            fail_on: Some(agent.to_string()),
        }
    }

    fn record(
        &mut self,
        kind: CommandKind,
        workload: &str,
        agent: &str,
        capacity: &CapacityVector,
    ) -> anyhow::Result<()> {
        if self.fail_on.as_deref() == Some(agent) {
            anyhow::bail!("agent {agent} rejected {kind:?}");
        }
        self.commands.push(LifecycleCommand {
            kind,
            workload: workload.to_string(),
            agent: agent.to_string(),
            capacity: capacity.clone(),
        });
        Ok(())
    }
}

impl ContainerLifecycleManager for RecordingLifecycle {
    fn start(
        &mut self,
        workload: &str,
        agent: &str,
        capacity: &CapacityVector,
    ) -> anyhow::Result<()> {
        self.record(CommandKind::Start, workload, agent, capacity)
    }

    fn stop(
        &mut self,
        workload: &str,
        agent: &str,
        capacity: &CapacityVector,
    ) -> anyhow::Result<()> {
        self.record(CommandKind::Stop, workload, agent, capacity)
    }
}
