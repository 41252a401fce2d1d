//! Candidate ordering for placement decisions.
//!
//! Agents are ranked tightest-fit first: least free memory, then least free
//! CPU, then agent id. Agents with large free capacity are kept back for
//! future, larger demands.

use std::cmp::Ordering;

use elastic_capacity::{AgentId, CapacityLedger, CapacityVector};

/// An agent considered for placement, with the free capacity it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub agent: AgentId,
    pub free: CapacityVector,
}

fn tightest_fit(a: &Candidate, b: &Candidate) -> Ordering {
    a.free
        .memory_mb()
        .cmp(&b.free.memory_mb())
        .then_with(|| a.free.cpu().cmp(&b.free.cpu()))
        .then_with(|| a.agent.cmp(&b.agent))
}

/// Agents from `free` accepted by `accept`, best candidate first.
pub fn rank_tightest_fit<F>(free: &CapacityLedger, accept: F) -> Vec<Candidate>
where
    F: Fn(&str, &CapacityVector) -> bool,
{
    let mut ranked: Vec<Candidate> = free
        .iter()
        .filter(|(agent, capacity)| accept(agent, capacity))
        .map(|(agent, capacity)| Candidate {
            agent: agent.clone(),
            free: capacity.clone(),
        })
        .collect();
    ranked.sort_by(tightest_fit);
    ranked
}
