use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use wine_serving::loadgen::{LoadGenerator, Targets, print_report};

/// Fires the four canned request patterns (no-batch, batch-1, batch-32,
/// batch-64, all values 1.0) back-to-back against the prediction
/// services and reports latency and throughput per pattern.
#[derive(Parser, Debug)]
#[command(name = "loadgen", version, about)]
struct Args {
    /// Target for the no-batch pattern.
    #[arg(long, default_value = "http://no-batch:80")]
    no_batch_url: String,

    /// Target for the batch-1 pattern.
    #[arg(long, default_value = "http://batch-1:80")]
    batch_1_url: String,

    /// Target for the batch-32 pattern.
    #[arg(long, default_value = "http://batch-32:80")]
    batch_32_url: String,

    /// Target for the batch-64 pattern.
    #[arg(long, default_value = "http://batch-64:80")]
    batch_64_url: String,

    /// Concurrent workers issuing requests.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Total number of requests across all patterns.
    #[arg(long, default_value_t = 400)]
    requests: usize,

    /// Seconds to wait for targets to become healthy (0 skips the wait).
    #[arg(long, default_value_t = 120)]
    wait_secs: u64,

    /// Write the full report as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();

    let targets = Targets {
        no_batch: args.no_batch_url,
        batch_1: args.batch_1_url,
        batch_32: args.batch_32_url,
        batch_64: args.batch_64_url,
    };

    let generator = LoadGenerator::new(targets, args.workers, args.requests)?;

    if args.wait_secs > 0 {
        generator.wait_for_ready(args.wait_secs).await?;
    }

    let report = generator.run().await?;
    print_report(&report);

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
