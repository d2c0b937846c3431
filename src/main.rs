//! circbuf - Workload Runner
//!
//! Menjalankan workload insert/extract acak dan melaporkan waktu yang
//! dihabiskan di dalam insert/extract saja.
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]
//!   RUST_LOG=debug cargo run --release -- --spsc --iterations 100000

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use circbuf::workload::{self, WorkloadConfig, WorkloadReport};

/// Randomized insert/extract benchmark for the circular buffer
#[derive(Parser, Debug)]
#[command(name = "circbuf", version)]
struct Args {
    /// Buffer capacity in bytes
    #[arg(short, long, default_value_t = 500_000)]
    capacity: usize,

    /// Random payload sizes range over 1..=2*max-record bytes
    #[arg(short, long, default_value_t = 75_000)]
    max_record: usize,

    /// Iterations per run (records per run with --spsc)
    #[arg(short, long, default_value_t = 50_000)]
    iterations: usize,

    /// RNG seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of runs to average
    #[arg(short, long, default_value_t = 3)]
    runs: usize,

    /// Run producer and consumer on separate threads
    #[arg(long)]
    spsc: bool,
}

impl From<&Args> for WorkloadConfig {
    fn from(args: &Args) -> Self {
        Self {
            capacity: args.capacity,
            max_record: args.max_record,
            iterations: args.iterations,
            seed: args.seed,
            runs: args.runs,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = WorkloadConfig::from(&args);
    ensure!(config.runs > 0, "--runs must be at least 1");

    info!(
        capacity = config.capacity,
        max_record = config.max_record,
        iterations = config.iterations,
        spsc = args.spsc,
        "starting workload"
    );

    let mut total_millis = 0.0;
    for run in 1..=config.runs {
        let result = if args.spsc {
            workload::run_spsc(&config)
        } else {
            workload::run(&config)
        };
        let report: WorkloadReport =
            result.with_context(|| format!("workload run {run} failed"))?;

        info!(
            run,
            written = report.records_written,
            read = report.records_read,
            rejected = report.rejected_writes,
            megabytes = report.bytes_written as f64 / 1_000_000.0,
            insert_ms = report.insert_time.as_secs_f64() * 1000.0,
            extract_ms = report.extract_time.as_secs_f64() * 1000.0,
            "run complete"
        );
        total_millis += report.total_millis();
    }

    let average = total_millis / config.runs as f64;
    info!(runs = config.runs, average_ms = average, "all runs complete");
    println!("{average:.3} ms");

    Ok(())
}
