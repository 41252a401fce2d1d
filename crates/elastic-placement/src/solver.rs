//! Placement solver: decides where a workload grows and by how much.
//!
//! A solver is configured with a snapshot (the workload's current footprint
//! and the free capacity each agent reports) plus a [`WorkloadPolicy`], and
//! produces a [`PlacementOutcome`]: the capacity to allocate and the capacity
//! to deallocate, per agent. Solving is a pure computation over the snapshot.
//! It never fails on capacity shortfall; it grants what fits.
//!
//! Three modes are supported:
//! 1. [`PlacementSolver::solve_by_agent_count`] spreads one placement quantum
//!    onto enough agents to reach a target agent count.
//! 2. [`PlacementSolver::solve_by_capacity`] grants CPU and memory, reusing
//!    hosting agents before opening new ones, and migrates placements off
//!    CPU-starved agents when that is the only way to grow.
//! 3. [`PlacementSolver::solve_scale_in`] releases capacity without dropping
//!    below the agent-count floor.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use elastic_capacity::{AgentId, CapacityLedger, CapacityVector, CpuCores};

use crate::error::PlacementResult;
use crate::policy::WorkloadPolicy;
use crate::ranking::rank_tightest_fit;

/// Allocation and deallocation deltas produced by one solve.
///
/// Both ledgers hold positive magnitudes to apply; neither is an absolute
/// total. Callers merge them into the footprint they own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    #[serde(rename = "allocate")]
    allocation: CapacityLedger,
    #[serde(rename = "deallocate")]
    deallocation: CapacityLedger,
}

impl PlacementOutcome {
    pub fn new(allocation: CapacityLedger, deallocation: CapacityLedger) -> Self {
        Self {
            allocation,
            deallocation,
        }
    }

    pub fn allocation_delta(&self) -> &CapacityLedger {
        &self.allocation
    }

    pub fn deallocation_delta(&self) -> &CapacityLedger {
        &self.deallocation
    }

    /// True when no change is required.
    pub fn is_empty(&self) -> bool {
        self.allocation.equals_zero() && self.deallocation.equals_zero()
    }

    /// Folds the deltas into `footprint`: deallocate first, then allocate.
    pub fn apply_to(&self, footprint: &CapacityLedger) -> PlacementResult<CapacityLedger> {
        let shrunk = footprint.subtract_ledger(&self.deallocation)?;
        Ok(shrunk.add_ledger(&self.allocation))
    }
}

/// Single-shot placement solver over one cluster snapshot.
#[derive(Debug, Clone)]
pub struct PlacementSolver {
    current_footprint: CapacityLedger,
    free_capacity: CapacityLedger,
    policy: WorkloadPolicy,
}

impl PlacementSolver {
    pub fn new(policy: WorkloadPolicy) -> Self {
        Self {
            current_footprint: CapacityLedger::new(),
            free_capacity: CapacityLedger::new(),
            policy,
        }
    }

    pub fn with_current_footprint(mut self, footprint: CapacityLedger) -> Self {
        self.current_footprint = footprint;
        self
    }

    pub fn with_free_capacity(mut self, free: CapacityLedger) -> Self {
        self.free_capacity = free;
        self
    }

    pub fn policy(&self) -> &WorkloadPolicy {
        &self.policy
    }

    pub fn current_footprint(&self) -> &CapacityLedger {
        &self.current_footprint
    }

    pub fn free_capacity(&self) -> &CapacityLedger {
        &self.free_capacity
    }

    /// Spread the workload onto at least `target_count` agents.
    ///
    /// Each newly used agent receives one placement quantum of memory and no
    /// CPU. The deallocation delta is always empty.
    pub fn solve_by_agent_count(&self, target_count: usize) -> PlacementResult<PlacementOutcome> {
        self.policy.validate()?;

        let mut draft = Draft::new(self);
        let target = target_count.max(self.policy.min_agent_count);
        let hosting = draft.hosting.len();
        if hosting >= target {
            debug!(hosting, target, "agent count already satisfied");
            return Ok(PlacementOutcome::default());
        }

        let needed = target - hosting;
        let quantum = self.policy.placement_quantum_mb;
        let mut opened = 0;
        while opened < needed && draft.memory_room() >= quantum {
            let Some(agent) = draft.next_new_agent() else {
                break;
            };
            draft.allocate(&agent, &CapacityVector::memory(quantum))?;
            opened += 1;
        }

        if opened < needed {
            debug!(
                needed,
                opened, "fewer agents than requested can take a placement quantum"
            );
        }
        info!(target, hosting, opened, "solved by agent count");

        Ok(draft.finish())
    }

    /// Grant `demand` CPU and memory to the workload.
    ///
    /// Memory is capped by the workload ceiling; CPU is not. Whatever the
    /// cluster cannot supply is silently withheld.
    pub fn solve_by_capacity(&self, demand: &CapacityVector) -> PlacementResult<PlacementOutcome> {
        self.policy.validate()?;

        let mut draft = Draft::new(self);
        let memory_wanted = demand.memory_mb().min(draft.memory_room());
        let memory_granted = draft.grant_memory(memory_wanted)?;
        let cpu_granted = draft.grant_cpu(demand.cpu())?;

        info!(
            demand = %demand,
            memory_granted,
            cpu_granted = %cpu_granted,
            migrated = draft.deallocation.len(),
            "solved by capacity"
        );

        Ok(draft.finish())
    }

    /// Release up to `release` from the workload's footprint.
    ///
    /// Smallest footprints are released first. An agent is emptied only while
    /// more than `min_agent_count` agents would still host the workload;
    /// otherwise it keeps one placement quantum of memory.
    pub fn solve_scale_in(&self, release: &CapacityVector) -> PlacementResult<PlacementOutcome> {
        self.policy.validate()?;

        let quantum = self.policy.placement_quantum_mb;
        let mut remaining = release.min(&self.current_footprint.total());
        let mut hosting = self.current_footprint.hosting_agents().len();
        let mut deallocation = CapacityLedger::new();

        let mut agents: Vec<(&AgentId, &CapacityVector)> = self
            .current_footprint
            .iter()
            .filter(|(_, footprint)| !footprint.equals_zero())
            .collect();
        agents.sort_by(|(a, x), (b, y)| {
            x.memory_mb()
                .cmp(&y.memory_mb())
                .then_with(|| x.cpu().cmp(&y.cpu()))
                .then_with(|| a.cmp(b))
        });

        for (agent, footprint) in agents {
            if remaining.equals_zero() {
                break;
            }

            let above_floor = hosting > self.policy.min_agent_count;
            let take = if remaining.satisfies(footprint) && above_floor {
                hosting -= 1;
                footprint.clone()
            } else {
                let kept = footprint.memory_mb().min(quantum);
                let memory = remaining.memory_mb().min(footprint.memory_mb() - kept);
                let cpu = remaining.cpu().min(footprint.cpu());
                let partial = CapacityVector::new(cpu, memory);
                if partial == *footprint {
                    // Would empty the agent while at the floor, e.g. a
                    // cpu-only footprint. The agent is left untouched.
                    continue;
                }
                partial
            };

            if take.equals_zero() {
                continue;
            }
            debug!(agent = %agent, released = %take, "releasing capacity");
            remaining = remaining.subtract_or_zero(&take);
            deallocation = deallocation.add(agent, &take);
        }

        if !remaining.equals_zero() {
            debug!(unreleased = %remaining, "agent floor limits scale-in");
        }
        info!(
            release = %release,
            released = %deallocation.total(),
            "solved scale-in"
        );

        Ok(PlacementOutcome::new(CapacityLedger::new(), deallocation))
    }
}

/// Working state for one solve.
struct Draft<'a> {
    policy: &'a WorkloadPolicy,
    footprint: &'a CapacityLedger,
    reported_free: &'a CapacityLedger,
    free: CapacityLedger,
    /// Agents hosting the workload, including ones opened during this solve.
    hosting: BTreeSet<AgentId>,
    allocation: CapacityLedger,
    deallocation: CapacityLedger,
}

impl<'a> Draft<'a> {
    fn new(solver: &'a PlacementSolver) -> Self {
        Self {
            policy: &solver.policy,
            footprint: &solver.current_footprint,
            reported_free: &solver.free_capacity,
            free: solver.free_capacity.clone(),
            hosting: solver.current_footprint.hosting_agents().into_iter().collect(),
            allocation: CapacityLedger::new(),
            deallocation: CapacityLedger::new(),
        }
    }

    fn finish(self) -> PlacementOutcome {
        PlacementOutcome::new(self.allocation, self.deallocation)
    }

    fn quantum(&self) -> u64 {
        self.policy.placement_quantum_mb
    }

    /// Memory that may still be allocated before hitting the ceiling.
    fn memory_room(&self) -> u64 {
        let used = self
            .footprint
            .total()
            .memory_mb()
            .saturating_add(self.allocation.total().memory_mb());
        self.policy.max_total_memory_mb.saturating_sub(used)
    }

    fn allocate(&mut self, agent: &str, capacity: &CapacityVector) -> PlacementResult<()> {
        self.free = self.free.subtract(agent, capacity)?;
        self.allocation = self.allocation.add(agent, capacity);
        if self.hosting.insert(agent.to_string()) {
            debug!(agent, granted = %capacity, "opened agent");
        } else {
            debug!(agent, granted = %capacity, "grew on hosting agent");
        }
        Ok(())
    }

    /// Best agent not yet hosting the workload with a free placement quantum.
    fn next_new_agent(&self) -> Option<AgentId> {
        let quantum = self.quantum();
        rank_tightest_fit(&self.free, |agent, free| {
            !self.hosting.contains(agent) && free.memory_mb() >= quantum
        })
        .into_iter()
        .next()
        .map(|candidate| candidate.agent)
    }

    /// Grants up to `wanted` MB and returns the amount granted.
    fn grant_memory(&mut self, wanted: u64) -> PlacementResult<u64> {
        let quantum = self.quantum();
        let mut remaining = wanted;

        // Honour the agent floor before packing onto existing agents.
        while self.hosting.len() < self.policy.min_agent_count && remaining >= quantum {
            let Some(agent) = self.next_new_agent() else {
                break;
            };
            self.allocate(&agent, &CapacityVector::memory(quantum))?;
            remaining -= quantum;
        }

        let spare = rank_tightest_fit(&self.free, |agent, free| {
            self.hosting.contains(agent) && !free.is_memory_equals_zero()
        });
        for candidate in spare {
            if remaining == 0 {
                break;
            }
            let take = candidate.free.memory_mb().min(remaining);
            self.allocate(&candidate.agent, &CapacityVector::memory(take))?;
            remaining -= take;
        }

        while remaining >= quantum {
            let Some(agent) = self.next_new_agent() else {
                break;
            };
            let take = self.free.get_or_zero(&agent).memory_mb().min(remaining);
            self.allocate(&agent, &CapacityVector::memory(take))?;
            remaining -= take;
        }

        if remaining > 0 {
            debug!(wanted, withheld = remaining, "not enough free memory");
        }
        Ok(wanted - remaining)
    }

    /// Grants up to `wanted` cores and returns the amount granted.
    fn grant_cpu(&mut self, wanted: CpuCores) -> PlacementResult<CpuCores> {
        let mut remaining = wanted.clone();

        let spare = rank_tightest_fit(&self.free, |agent, free| {
            self.hosting.contains(agent) && !free.is_cpu_equals_zero()
        });
        for candidate in spare {
            if remaining.is_zero() {
                break;
            }
            let take = candidate.free.cpu().min(remaining.clone());
            remaining = remaining.saturating_sub(&take);
            self.allocate(&candidate.agent, &CapacityVector::cpu_only(take))?;
        }

        if !remaining.is_zero() {
            remaining = self.migrate_for_cpu(remaining)?;
        }
        if !remaining.is_zero() {
            debug!(wanted = %wanted, withheld = %remaining, "not enough free cpu");
        }
        Ok(wanted.saturating_sub(&remaining))
    }

    /// Moves placements off CPU-starved agents onto agents with spare CPU.
    ///
    /// Each move deallocates one quantum from an anchor and allocates one
    /// quantum plus CPU on a new agent, so the memory footprint is unchanged.
    /// An anchor always keeps at least one quantum. Returns the CPU still
    /// missing afterwards.
    fn migrate_for_cpu(&mut self, mut remaining: CpuCores) -> PlacementResult<CpuCores> {
        let quantum = self.quantum();

        let mut anchors: Vec<(AgentId, u64)> = self
            .footprint
            .iter()
            .filter(|(agent, footprint)| {
                !footprint.equals_zero()
                    && self.reported_free.get_or_zero(agent).is_cpu_equals_zero()
            })
            .map(|(agent, footprint)| (agent.clone(), footprint.memory_mb()))
            .collect();
        anchors.sort_by(|(a, x), (b, y)| y.cmp(x).then_with(|| a.cmp(b)));

        for (anchor, mut movable) in anchors {
            while !remaining.is_zero() && movable.saturating_sub(quantum) >= quantum {
                if self.memory_room() < quantum {
                    debug!(anchor = %anchor, "memory ceiling blocks migration");
                    return Ok(remaining);
                }
                let target = rank_tightest_fit(&self.free, |agent, free| {
                    !self.hosting.contains(agent)
                        && free.memory_mb() >= quantum
                        && !free.is_cpu_equals_zero()
                })
                .into_iter()
                .next();
                let Some(target) = target else {
                    return Ok(remaining);
                };

                let cpu = target.free.cpu().min(remaining.clone());
                self.allocate(&target.agent, &CapacityVector::new(cpu.clone(), quantum))?;
                self.deallocation = self
                    .deallocation
                    .add(&anchor, &CapacityVector::memory(quantum));
                movable -= quantum;
                remaining = remaining.saturating_sub(&cpu);

                info!(
                    from = %anchor,
                    to = %target.agent,
                    cpu = %cpu,
                    quantum_mb = quantum,
                    "migrating placement"
                );
            }
            if remaining.is_zero() {
                break;
            }
        }

        Ok(remaining)
    }
}
