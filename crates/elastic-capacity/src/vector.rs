//! Two-axis capacity vectors (CPU cores, memory megabytes).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cpu::CpuCores;
use crate::error::{CapacityError, CapacityResult};

/// An immutable resource quantity.
///
/// Every value handed out by this crate has non-negative components:
/// subtraction either fails ([`CapacityVector::subtract`]) or clamps
/// ([`CapacityVector::subtract_or_zero`]). Memory addition saturates at
/// `u64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CapacityVector {
    #[serde(default)]
    cpu: CpuCores,
    #[serde(default)]
    memory_mb: u64,
}

impl CapacityVector {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(cpu: CpuCores, memory_mb: u64) -> Self {
        Self { cpu, memory_mb }
    }

    /// Whole cores plus memory, the common case in tests and configs.
    pub fn cores(cpu: u32, memory_mb: u64) -> Self {
        Self::new(CpuCores::from_cores(cpu), memory_mb)
    }

    pub fn memory(memory_mb: u64) -> Self {
        Self::new(CpuCores::zero(), memory_mb)
    }

    pub fn cpu_only(cpu: CpuCores) -> Self {
        Self::new(cpu, 0)
    }

    pub fn cpu(&self) -> CpuCores {
        self.cpu.clone()
    }

    pub fn memory_mb(&self) -> u64 {
        self.memory_mb
    }

    pub fn with_cpu(self, cpu: CpuCores) -> Self {
        Self { cpu, ..self }
    }

    pub fn with_memory_mb(self, memory_mb: u64) -> Self {
        Self { memory_mb, ..self }
    }

    /// Component-wise sum. CPU is exact; memory saturates at `u64::MAX`.
    pub fn add(&self, other: &CapacityVector) -> CapacityVector {
        CapacityVector {
            cpu: &self.cpu + &other.cpu,
            memory_mb: self.memory_mb.saturating_add(other.memory_mb),
        }
    }

    /// Component-wise difference; fails if either axis would go negative.
    pub fn subtract(&self, other: &CapacityVector) -> CapacityResult<CapacityVector> {
        let negative = || CapacityError::NegativeCapacity {
            minuend: self.to_string(),
            subtrahend: other.to_string(),
        };
        let cpu = self.cpu.checked_sub(&other.cpu).ok_or_else(negative)?;
        let memory_mb = self
            .memory_mb
            .checked_sub(other.memory_mb)
            .ok_or_else(negative)?;
        Ok(CapacityVector { cpu, memory_mb })
    }

    /// Component-wise difference with each axis clamped at zero independently.
    pub fn subtract_or_zero(&self, other: &CapacityVector) -> CapacityVector {
        CapacityVector {
            cpu: self.cpu.saturating_sub(&other.cpu),
            memory_mb: self.memory_mb.saturating_sub(other.memory_mb),
        }
    }

    /// Component-wise minimum.
    pub fn min(&self, other: &CapacityVector) -> CapacityVector {
        CapacityVector {
            cpu: self.cpu.clone().min(other.cpu.clone()),
            memory_mb: self.memory_mb.min(other.memory_mb),
        }
    }

    pub fn equals_zero(&self) -> bool {
        self.is_cpu_equals_zero() && self.is_memory_equals_zero()
    }

    pub fn is_cpu_equals_zero(&self) -> bool {
        self.cpu.is_zero()
    }

    pub fn is_memory_equals_zero(&self) -> bool {
        self.memory_mb == 0
    }

    /// `self >= other` on both axes.
    pub fn satisfies(&self, other: &CapacityVector) -> bool {
        self.cpu >= other.cpu && self.memory_mb >= other.memory_mb
    }

    /// `self > other` on both axes at once.
    pub fn more_than_satisfies(&self, other: &CapacityVector) -> bool {
        self.cpu > other.cpu && self.memory_mb > other.memory_mb
    }
}

impl std::iter::Sum for CapacityVector {
    fn sum<I: Iterator<Item = CapacityVector>>(iter: I) -> Self {
        iter.fold(CapacityVector::zero(), |acc, v| acc.add(&v))
    }
}

impl fmt::Display for CapacityVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(cpu={}, mem={}MB)", self.cpu, self.memory_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn half() -> CpuCores {
        CpuCores::from_ratio(1, 2).unwrap()
    }

    #[test]
    fn add_is_component_wise() {
        let a = CapacityVector::new(half(), 256);
        let b = CapacityVector::cores(1, 512);
        let sum = a.add(&b);
        assert_eq!(sum.cpu(), CpuCores::from_ratio(3, 2).unwrap());
        assert_eq!(sum.memory_mb(), 768);
    }

    #[test]
    fn memory_addition_saturates() {
        let huge = CapacityVector::memory(i64::MAX as u64);
        let total: CapacityVector = std::iter::repeat_n(huge, 3).sum();
        assert_eq!(total.memory_mb(), u64::MAX);
        assert!(total.is_cpu_equals_zero());
    }

    #[test]
    fn subtract_fails_when_memory_goes_negative() {
        let a = CapacityVector::cores(2, 256);
        let b = CapacityVector::cores(1, 512);
        assert!(matches!(
            a.subtract(&b),
            Err(CapacityError::NegativeCapacity { .. })
        ));
    }

    #[test]
    fn subtract_fails_when_cpu_goes_negative() {
        let a = CapacityVector::cores(1, 1024);
        let b = CapacityVector::cores(2, 512);
        assert!(a.subtract(&b).is_err());
    }

    #[test]
    fn subtract_or_zero_clamps_each_axis() {
        let a = CapacityVector::cores(1, 1024);
        let b = CapacityVector::cores(2, 512);
        assert_eq!(a.subtract_or_zero(&b), CapacityVector::memory(512));
    }

    #[test]
    fn zero_tests_per_axis() {
        let v = CapacityVector::memory(512);
        assert!(v.is_cpu_equals_zero());
        assert!(!v.is_memory_equals_zero());
        assert!(!v.equals_zero());
        assert!(CapacityVector::zero().equals_zero());
    }

    #[test]
    fn equal_vectors_satisfy_but_not_more_than_satisfy() {
        let a = CapacityVector::cores(2, 512);
        assert!(a.satisfies(&a));
        assert!(!a.more_than_satisfies(&a));
    }

    #[test]
    fn more_than_satisfies_needs_both_axes_strict() {
        let a = CapacityVector::cores(3, 512);
        let b = CapacityVector::cores(2, 512);
        assert!(a.satisfies(&b));
        assert!(!a.more_than_satisfies(&b));
        assert!(CapacityVector::cores(3, 513).more_than_satisfies(&b));
    }

    #[test]
    fn deserializes_from_toml_inline_table() {
        let v: CapacityVector = toml::from_str("cpu = \"1/2\"\nmemory_mb = 512\n").unwrap();
        assert_eq!(v, CapacityVector::new(half(), 512));

        let only_mem: CapacityVector = toml::from_str("memory_mb = 128\n").unwrap();
        assert_eq!(only_mem, CapacityVector::memory(128));
    }

    fn arb_vector() -> impl Strategy<Value = CapacityVector> {
        (0i64..10_000, 1i64..64, 0u64..1_000_000).prop_map(|(n, d, mem)| {
            CapacityVector::new(CpuCores::from_ratio(n, d).unwrap(), mem)
        })
    }

    proptest! {
        #[test]
        fn add_then_subtract_round_trips(a in arb_vector(), b in arb_vector()) {
            prop_assert_eq!(a.add(&b).subtract(&b).unwrap(), a);
        }

        #[test]
        fn satisfied_subtraction_is_non_negative(a in arb_vector(), b in arb_vector()) {
            let big = a.add(&b);
            prop_assert!(big.satisfies(&b));
            let diff = big.subtract(&b).unwrap();
            prop_assert!(diff.satisfies(&CapacityVector::zero()));
        }

        #[test]
        fn more_than_satisfies_implies_satisfies(a in arb_vector(), b in arb_vector()) {
            if a.more_than_satisfies(&b) {
                prop_assert!(a.satisfies(&b));
            }
            prop_assert!(!a.more_than_satisfies(&a));
        }
    }
}
