//! Snapshot file regression tests.
//!
//! Loads cluster snapshots from disk and runs them through the solver and
//! the reconcile step, the way the `elastic-plan` binary does.

use std::io::Write;

use elastic_capacity::{CapacityError, CapacityLedger, CapacityVector};
use elastic_placement::*;

fn write_snapshot(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn ledger(entries: &[(&str, u32, u64)]) -> CapacityLedger {
    entries
        .iter()
        .map(|(agent, cpu, mem)| (agent.to_string(), CapacityVector::cores(*cpu, *mem)))
        .collect()
}

#[test]
fn spreads_by_count_from_file() {
    let file = write_snapshot(
        r#"
[policy]
placement_quantum_mb = 512

[free]
agent1 = { cpu = 6, memory_mb = 1536 }
"#,
    );
    let snapshot = ClusterSnapshot::from_file(file.path()).unwrap();
    let outcome = snapshot.solver().solve_by_agent_count(1).unwrap();

    assert_eq!(outcome.allocation_delta(), &ledger(&[("agent1", 0, 512)]));
    assert!(outcome.deallocation_delta().is_empty());
}

#[test]
fn migration_scenario_from_file() {
    let file = write_snapshot(
        r#"
[policy]
placement_quantum_mb = 512
max_total_memory_mb = 8192

[footprint]
agent1 = { cpu = 2, memory_mb = 512 }
agent2 = { cpu = 4, memory_mb = 1024 }

[free]
agent1 = { cpu = 2, memory_mb = 512 }
agent3 = { cpu = 4, memory_mb = 1024 }
"#,
    );
    let snapshot = ClusterSnapshot::from_file(file.path()).unwrap();
    let mut lifecycle = RecordingLifecycle::new();
    let demand = Demand::Capacity {
        capacity: CapacityVector::cores(6, 0),
    };

    let report =
        reconcile_once(&snapshot, &mut lifecycle, "api", &snapshot.policy, &demand).unwrap();

    assert_eq!(
        report.outcome.deallocation_delta(),
        &ledger(&[("agent2", 0, 512)])
    );
    assert_eq!(
        report.outcome.allocation_delta(),
        &ledger(&[("agent1", 2, 0), ("agent3", 4, 512)])
    );

    let json = serde_json::to_value(&report.outcome).unwrap();
    assert_eq!(json["deallocate"]["agent2"]["memory_mb"], 512);
    assert_eq!(json["allocate"]["agent3"]["cpu"], "4");
}

#[test]
fn missing_file_is_a_snapshot_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ClusterSnapshot::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, PlacementError::Snapshot(_)));
}

#[test]
fn inconsistent_fold_reports_unknown_agent() {
    let file = write_snapshot(
        r#"
[policy]
placement_quantum_mb = 512

[footprint]
agent1 = { cpu = 1, memory_mb = 512 }
"#,
    );
    let snapshot = ClusterSnapshot::from_file(file.path()).unwrap();
    let bogus = PlacementOutcome::new(CapacityLedger::new(), ledger(&[("ghost", 0, 512)]));

    let err = bogus.apply_to(&snapshot.footprint).unwrap_err();
    assert!(matches!(
        err,
        PlacementError::Capacity(CapacityError::UnknownAgent(agent)) if agent == "ghost"
    ));
}
