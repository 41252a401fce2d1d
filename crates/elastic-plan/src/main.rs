//! elastic-plan: one placement decision from a cluster snapshot.
//!
//! Loads a TOML snapshot (policy, footprint, free capacity), runs a single
//! solve through the reconcile step with a recording lifecycle manager, and
//! prints the allocate/deallocate deltas as JSON on stdout.
//!
//! # Usage
//!
//! ```text
//! elastic-plan --snapshot cluster.toml count 3
//! elastic-plan --snapshot cluster.toml grow --cpu 1/2 --memory-mb 1024
//! elastic-plan --snapshot cluster.toml shrink --memory-mb 512
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use elastic_capacity::{CapacityVector, CpuCores};
use elastic_placement::Demand;

mod commands;

#[derive(Parser)]
#[command(
    name = "elastic-plan",
    about = "Compute placement deltas for an elastic workload",
    version
)]
struct Cli {
    /// Cluster snapshot file (TOML).
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Workload name used in log output and lifecycle commands.
    #[arg(short, long, default_value = "default")]
    workload: String,

    /// Write the snapshot expected after applying the deltas to this file.
    #[arg(long)]
    next_snapshot: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Spread onto at least COUNT agents.
    Count { count: usize },
    /// Grow by the given CPU and memory.
    Grow {
        /// CPU cores: 2, 0.5 or 1/2.
        #[arg(long, default_value = "0")]
        cpu: CpuCores,
        #[arg(long, default_value = "0")]
        memory_mb: u64,
    },
    /// Release the given CPU and memory.
    Shrink {
        #[arg(long, default_value = "0")]
        cpu: CpuCores,
        #[arg(long, default_value = "0")]
        memory_mb: u64,
    },
}

impl Command {
    fn demand(&self) -> Demand {
        match self {
            Command::Count { count } => Demand::AgentCount { count: *count },
            Command::Grow { cpu, memory_mb } => Demand::Capacity {
                capacity: CapacityVector::new(cpu.clone(), *memory_mb),
            },
            Command::Shrink { cpu, memory_mb } => Demand::Release {
                capacity: CapacityVector::new(cpu.clone(), *memory_mb),
            },
        }
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,elastic_placement=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    commands::plan(
        &cli.snapshot,
        &cli.workload,
        &cli.command.demand(),
        cli.next_snapshot.as_deref(),
        std::io::stdout().lock(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let base = ["elastic-plan", "--snapshot", "cluster.toml"];
        Cli::try_parse_from(base.iter().chain(args).copied()).unwrap()
    }

    #[test]
    fn grow_maps_to_capacity_demand() {
        let cli = parse(&["grow", "--cpu", "1/2", "--memory-mb", "1024"]);
        assert_eq!(
            cli.command.demand(),
            Demand::Capacity {
                capacity: CapacityVector::new(CpuCores::from_ratio(1, 2).unwrap(), 1024),
            }
        );
        assert_eq!(cli.workload, "default");
        assert!(cli.next_snapshot.is_none());
    }

    #[test]
    fn shrink_defaults_missing_axis_to_zero() {
        let cli = parse(&["shrink", "--memory-mb", "512"]);
        assert_eq!(
            cli.command.demand(),
            Demand::Release {
                capacity: CapacityVector::memory(512),
            }
        );
    }

    #[test]
    fn count_with_next_snapshot() {
        let cli = parse(&["--next-snapshot", "next.toml", "-w", "api", "count", "3"]);
        assert_eq!(cli.command.demand(), Demand::AgentCount { count: 3 });
        assert_eq!(cli.next_snapshot, Some(PathBuf::from("next.toml")));
        assert_eq!(cli.workload, "api");
    }

    #[test]
    fn malformed_cpu_is_rejected() {
        let args = ["elastic-plan", "--snapshot", "c.toml", "grow", "--cpu", "1/0"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
