//! Per-agent capacity ledgers.
//!
//! A ledger maps agents to capacity vectors. The same type describes a
//! workload's footprint, the free capacity reported by agents, and the
//! allocate/deallocate deltas produced by the solver. An absent agent is
//! equivalent to a zero vector.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::error::{CapacityError, CapacityResult};
use crate::vector::CapacityVector;

/// Opaque, cluster-wide-unique agent identifier.
pub type AgentId = String;

/// Immutable mapping of agent to capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityLedger {
    entries: BTreeMap<AgentId, CapacityVector>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a ledger with `capacity` added to `agent`'s entry.
    ///
    /// Adding a zero vector to an absent agent leaves the ledger unchanged.
    pub fn add(&self, agent: &str, capacity: &CapacityVector) -> CapacityLedger {
        let mut next = self.clone();
        next.add_in_place(agent, capacity);
        next
    }

    /// Merges two ledgers, summing agents present in both.
    pub fn add_ledger(&self, other: &CapacityLedger) -> CapacityLedger {
        let mut next = self.clone();
        for (agent, capacity) in &other.entries {
            next.add_in_place(agent, capacity);
        }
        next
    }

    /// Returns a ledger with `capacity` removed from `agent`'s entry.
    ///
    /// Fails if the agent has no entry or either axis would go negative.
    /// An entry that reaches zero is dropped.
    pub fn subtract(
        &self,
        agent: &str,
        capacity: &CapacityVector,
    ) -> CapacityResult<CapacityLedger> {
        let mut next = self.clone();
        next.subtract_in_place(agent, capacity)?;
        Ok(next)
    }

    /// Per-agent subtraction of every entry in `other`.
    ///
    /// Zero entries in `other` for agents unknown to `self` are ignored.
    pub fn subtract_ledger(&self, other: &CapacityLedger) -> CapacityResult<CapacityLedger> {
        let mut next = self.clone();
        for (agent, capacity) in &other.entries {
            if capacity.equals_zero() && !next.contains(agent) {
                continue;
            }
            next.subtract_in_place(agent, capacity)?;
        }
        Ok(next)
    }

    pub fn get(&self, agent: &str) -> Option<&CapacityVector> {
        self.entries.get(agent)
    }

    pub fn get_or_zero(&self, agent: &str) -> CapacityVector {
        self.entries.get(agent).cloned().unwrap_or_default()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.entries.contains_key(agent)
    }

    /// Agents with an explicit entry, in identifier order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.entries.keys().cloned().collect()
    }

    /// Agents whose entry is non-zero.
    pub fn hosting_agents(&self) -> Vec<AgentId> {
        self.entries
            .iter()
            .filter(|(_, capacity)| !capacity.equals_zero())
            .map(|(agent, _)| agent.clone())
            .collect()
    }

    /// Component-wise sum of every entry; memory saturates at `u64::MAX`.
    pub fn total(&self) -> CapacityVector {
        self.entries.values().cloned().sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if every entry is zero (vacuously true when empty).
    pub fn equals_zero(&self) -> bool {
        self.entries.values().all(CapacityVector::equals_zero)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, AgentId, CapacityVector> {
        self.entries.iter()
    }

    fn add_in_place(&mut self, agent: &str, capacity: &CapacityVector) {
        match self.entries.get_mut(agent) {
            Some(existing) => *existing = existing.add(capacity),
            None if capacity.equals_zero() => {}
            None => {
                self.entries.insert(agent.to_string(), capacity.clone());
            }
        }
    }

    fn subtract_in_place(&mut self, agent: &str, capacity: &CapacityVector) -> CapacityResult<()> {
        let existing = self
            .entries
            .get(agent)
            .ok_or_else(|| CapacityError::UnknownAgent(agent.to_string()))?;
        let remaining = existing.subtract(capacity)?;
        if remaining.equals_zero() {
            self.entries.remove(agent);
        } else {
            self.entries.insert(agent.to_string(), remaining);
        }
        Ok(())
    }
}

impl FromIterator<(AgentId, CapacityVector)> for CapacityLedger {
    /// Collects entries, summing duplicates. Explicit zero entries are kept.
    fn from_iter<I: IntoIterator<Item = (AgentId, CapacityVector)>>(iter: I) -> Self {
        let mut entries: BTreeMap<AgentId, CapacityVector> = BTreeMap::new();
        for (agent, capacity) in iter {
            let slot = entries.entry(agent).or_default();
            *slot = slot.add(&capacity);
        }
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a CapacityLedger {
    type Item = (&'a AgentId, &'a CapacityVector);
    type IntoIter = btree_map::Iter<'a, AgentId, CapacityVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
