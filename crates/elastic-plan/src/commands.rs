//! The `elastic-plan` solve command.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use elastic_placement::{ClusterSnapshot, Demand, RecordingLifecycle, reconcile_once};

/// Solves `demand` against the snapshot at `snapshot_path`, writes the
/// deltas as JSON to `out` and, if asked, the folded snapshot to
/// `next_snapshot`.
pub fn plan(
    snapshot_path: &Path,
    workload: &str,
    demand: &Demand,
    next_snapshot: Option<&Path>,
    mut out: impl Write,
) -> anyhow::Result<()> {
    let snapshot = ClusterSnapshot::from_file(snapshot_path)
        .with_context(|| format!("loading {}", snapshot_path.display()))?;

    let mut lifecycle = RecordingLifecycle::new();
    let report = reconcile_once(&snapshot, &mut lifecycle, workload, &snapshot.policy, demand)?;
    for command in &lifecycle.commands {
        debug!(
            kind = ?command.kind,
            agent = %command.agent,
            capacity = %command.capacity,
            "dry-run command"
        );
    }

    serde_json::to_writer_pretty(&mut out, &report.outcome)?;
    writeln!(out)?;

    if let Some(path) = next_snapshot {
        let next = snapshot.fold(&report.outcome)?;
        std::fs::write(path, next.to_toml_string()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote next snapshot");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elastic_capacity::CapacityVector;

    const MIGRATION: &str = r#"
[policy]
placement_quantum_mb = 512
max_total_memory_mb = 8192

[footprint]
agent1 = { cpu = 2, memory_mb = 512 }
agent2 = { cpu = 4, memory_mb = 1024 }

[free]
agent1 = { cpu = 2, memory_mb = 512 }
agent3 = { cpu = 4, memory_mb = 1024 }
"#;

    #[test]
    fn prints_deltas_and_writes_next_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("cluster.toml");
        std::fs::write(&snapshot_path, MIGRATION).unwrap();
        let next_path = dir.path().join("next.toml");
        let demand = Demand::Capacity {
            capacity: CapacityVector::cores(6, 0),
        };

        let mut out = Vec::new();
        plan(&snapshot_path, "api", &demand, Some(&next_path), &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["deallocate"]["agent2"]["memory_mb"], 512);
        assert_eq!(json["allocate"]["agent1"]["cpu"], "2");
        assert_eq!(json["allocate"]["agent3"]["cpu"], "4");

        let next = ClusterSnapshot::from_file(&next_path).unwrap();
        assert_eq!(next.footprint.total(), CapacityVector::cores(12, 1536));
        assert_eq!(next.free.get_or_zero("agent3"), CapacityVector::memory(512));
        assert_eq!(next.policy.max_total_memory_mb, 8192);
    }

    #[test]
    fn next_snapshot_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("cluster.toml");
        std::fs::write(&snapshot_path, MIGRATION).unwrap();

        let mut out = Vec::new();
        plan(&snapshot_path, "api", &Demand::AgentCount { count: 2 }, None, &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(json["allocate"].as_object().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_snapshot_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let mut out = Vec::new();
        let err = plan(&missing, "api", &Demand::AgentCount { count: 1 }, None, &mut out)
            .unwrap_err();

        assert!(err.to_string().starts_with("loading"));
        assert!(out.is_empty());
    }
}
