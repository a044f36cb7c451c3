use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use newts_sizing::analysis::DEFAULT_RRD_DIR;
use newts_sizing::{Analyzer, AnalyzerConfig, SizingParams, plan_cluster};
use tracing_subscriber::EnvFilter;

/// A CLI to help sizing a Cassandra/ScyllaDB cluster for Newts.
#[derive(Debug, Parser)]
#[command(name = "newts-sizing", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyses the RRD/JRB directory to produce estimates about total metrics
    /// similar to the Evaluation Layer.
    #[command(visible_alias = "a")]
    Analysis(AnalysisArgs),

    /// Calculates the number of instances required for a Cassandra/ScyllaDB cluster.
    #[command(visible_alias = "s")]
    Size(SizeArgs),
}

#[derive(Debug, clap::Args)]
struct AnalysisArgs {
    /// The RRD/JRB directory.
    #[arg(short, long, default_value = DEFAULT_RRD_DIR)]
    rrd_dir: PathBuf,

    /// Only process files modified within this window (e.g. `48h`, `2days`).
    #[arg(short, long, default_value = "48h", value_parser = humantime::parse_duration)]
    newer_than: Duration,

    /// Assume storeByGroup is disabled: one metric per RRD/JRB file.
    #[arg(short, long)]
    single_metric: bool,

    /// Show debug information and list every node, interface and resource.
    #[arg(short, long)]
    debug: bool,

    /// Worker threads used to walk the directory (0 = one per core).
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

#[derive(Debug, clap::Args)]
struct SizeArgs {
    /// TTL, or total metric retention in days.
    #[arg(short, long, default_value_t = 365.0)]
    ttl: f64,

    /// Average data collection interval in minutes.
    #[arg(short, long, default_value_t = 5.0)]
    interval: f64,

    /// Average sample size in bytes; the size of a row from the newts.samples table.
    #[arg(short, long, default_value_t = 18.0)]
    sample_size: f64,

    /// The desired replication factor for the Cassandra cluster.
    #[arg(short, long, default_value_t = 2.0)]
    replication_factor: f64,

    /// Percentage of disk space per Cassandra instance reserved for compactions.
    #[arg(short = 'o', long, default_value_t = 15.0)]
    disk_overhead: f64,

    /// The expected total number of metrics to persist into the cluster.
    /// Mutually exclusive with --injection-rate.
    #[arg(short = 'm', long, default_value_t = 0.0)]
    total_metrics: f64,

    /// The expected sample injection rate in samples per second.
    /// Mutually exclusive with --total-metrics.
    #[arg(short = 'j', long, default_value_t = 0.0)]
    injection_rate: f64,

    /// The total disk space per Cassandra instance in gigabytes.
    #[arg(short, long)]
    disk_space: f64,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "newts_sizing=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init();
}

fn analyze(args: AnalysisArgs) -> anyhow::Result<()> {
    init_tracing(args.debug);

    let analyzer = Analyzer::new(AnalyzerConfig {
        rrd_dir: args.rrd_dir,
        newer_than: args.newer_than,
        single_metric: args.single_metric,
        debug: args.debug,
        threads: args.threads,
    });

    let mut out = io::stdout().lock();
    writeln!(out, "{analyzer}").context("cannot write report")?;
    let report = analyzer.run().context("directory analysis failed")?;
    writeln!(out, "{report}").context("cannot write report")?;
    out.flush().context("cannot write report")
}

fn size(args: SizeArgs) -> anyhow::Result<()> {
    init_tracing(false);

    let plan = plan_cluster(&SizingParams {
        ttl_days: args.ttl,
        interval_minutes: args.interval,
        sample_size_bytes: args.sample_size,
        replication_factor: args.replication_factor,
        overhead_percent: args.disk_overhead,
        total_metrics: args.total_metrics,
        injection_rate: args.injection_rate,
        disk_space_gb: args.disk_space,
    })?;
    let mut out = io::stdout().lock();
    writeln!(out, "{plan}").context("cannot write report")?;
    out.flush().context("cannot write report")
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analysis(args) => analyze(args),
        Command::Size(args) => size(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}
