//! Fixed-shape traffic generator for the prediction services.
//!
//! Replays the four canned request patterns (one labeled record, and
//! positional batches of 1, 32, and 64) back-to-back with no
//! inter-request delay, each against its own target host.

pub mod stats;

pub use stats::Statistics;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::schema::WineFeatures;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    NoBatch,
    Batch1,
    Batch32,
    Batch64,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [
        Pattern::NoBatch,
        Pattern::Batch1,
        Pattern::Batch32,
        Pattern::Batch64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pattern::NoBatch => "no-batch",
            Pattern::Batch1 => "batch-1",
            Pattern::Batch32 => "batch-32",
            Pattern::Batch64 => "batch-64",
        }
    }

    /// Constant request body for this pattern, every value 1.0.
    pub fn body(self) -> serde_json::Value {
        match self {
            Pattern::NoBatch => json!(WineFeatures::uniform(1.0)),
            Pattern::Batch1 => json!({ "batches": vec![vec![1.0; 13]; 1] }),
            Pattern::Batch32 => json!({ "batches": vec![vec![1.0; 13]; 32] }),
            Pattern::Batch64 => json!({ "batches": vec![vec![1.0; 13]; 64] }),
        }
    }
}

/// One base URL per pattern; the services are standalone processes on
/// distinct hosts.
#[derive(Debug, Clone)]
pub struct Targets {
    pub no_batch: String,
    pub batch_1: String,
    pub batch_32: String,
    pub batch_64: String,
}

impl Targets {
    pub fn url(&self, pattern: Pattern) -> &str {
        match pattern {
            Pattern::NoBatch => &self.no_batch,
            Pattern::Batch1 => &self.batch_1,
            Pattern::Batch32 => &self.batch_32,
            Pattern::Batch64 => &self.batch_64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub pattern: String,
    pub requests: usize,
    pub errors: usize,
    pub latency_ms: Statistics,
    pub throughput_rps: f64,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub total_requests: usize,
    pub workers: usize,
    pub patterns: Vec<PatternReport>,
}

pub struct LoadGenerator {
    client: reqwest::Client,
    targets: Targets,
    workers: usize,
    requests: usize,
}

/// Outcome of one request: latency for a success, `None` for an error.
type Sample = (Pattern, Option<f64>);

impl LoadGenerator {
    pub fn new(targets: Targets, workers: usize, requests: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            targets,
            workers,
            requests,
        })
    }

    /// Polls every target's health endpoint until all respond or the
    /// timeout elapses.
    pub async fn wait_for_ready(&self, timeout_secs: u64) -> Result<()> {
        for pattern in Pattern::ALL {
            let base = self.targets.url(pattern);
            let health_url = format!("{base}/health");
            let start = Instant::now();

            info!("waiting for {base}...");
            loop {
                match self.client.get(&health_url).send().await {
                    Ok(response) if response.status().is_success() => break,
                    _ if start.elapsed().as_secs() >= timeout_secs => {
                        anyhow::bail!("target {base} not ready within {timeout_secs}s")
                    }
                    _ => tokio::time::sleep(Duration::from_secs(2)).await,
                }
            }
            info!("{base} is ready");
        }
        Ok(())
    }

    /// Issues the configured number of requests across the worker pool,
    /// cycling through the four patterns, and summarizes the outcome.
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let bodies: Arc<[serde_json::Value; 4]> =
            Arc::new(Pattern::ALL.map(|p| p.body()));
        let issued = Arc::new(AtomicUsize::new(0));

        let pb = ProgressBar::new(self.requests as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .context("invalid progress template")?
                .progress_chars("=>-"),
        );
        pb.set_message("Running");

        let start = Instant::now();
        let mut handles = Vec::with_capacity(self.workers);

        for _ in 0..self.workers {
            let client = self.client.clone();
            let targets = self.targets.clone();
            let bodies = Arc::clone(&bodies);
            let issued = Arc::clone(&issued);
            let pb = pb.clone();
            let total = self.requests;

            handles.push(tokio::spawn(async move {
                let mut samples: Vec<Sample> = Vec::new();
                loop {
                    let i = issued.fetch_add(1, Ordering::Relaxed);
                    if i >= total {
                        break;
                    }
                    let idx = i % Pattern::ALL.len();
                    let pattern = Pattern::ALL[idx];
                    let url = format!("{}/predict", targets.url(pattern));

                    let request_start = Instant::now();
                    let ok = match client.post(&url).json(&bodies[idx]).send().await {
                        Ok(response) => response.status().is_success(),
                        Err(_) => false,
                    };
                    let latency_ms = request_start.elapsed().as_secs_f64() * 1000.0;

                    samples.push((pattern, ok.then_some(latency_ms)));
                    pb.inc(1);
                }
                samples
            }));
        }

        let mut samples = Vec::with_capacity(self.requests);
        for handle in handles {
            samples.extend(handle.await.context("load worker panicked")?);
        }

        let duration_sec = start.elapsed().as_secs_f64();
        pb.finish_with_message("Complete");

        let patterns = aggregate(&samples, duration_sec);
        let total_errors: usize = patterns.iter().map(|p| p.errors).sum();
        if total_errors > 0 {
            warn!("{total_errors}/{} requests failed", samples.len());
        }

        Ok(RunReport {
            started_at,
            duration_sec,
            total_requests: samples.len(),
            workers: self.workers,
            patterns,
        })
    }
}

/// Groups samples by pattern and computes latency and throughput
/// summaries. Throughput counts successful requests only.
fn aggregate(samples: &[Sample], duration_sec: f64) -> Vec<PatternReport> {
    Pattern::ALL
        .iter()
        .map(|&pattern| {
            let latencies: Vec<f64> = samples
                .iter()
                .filter(|(p, outcome)| *p == pattern && outcome.is_some())
                .filter_map(|(_, outcome)| *outcome)
                .collect();
            let requests = samples.iter().filter(|(p, _)| *p == pattern).count();
            let errors = requests - latencies.len();

            PatternReport {
                pattern: pattern.name().to_string(),
                requests,
                errors,
                latency_ms: Statistics::from_samples(&latencies),
                throughput_rps: if duration_sec > 0.0 {
                    latencies.len() as f64 / duration_sec
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Prints a per-pattern summary table to stdout.
pub fn print_report(report: &RunReport) {
    println!();
    println!("{}", "=".repeat(78));
    println!(
        "Load run: {} requests, {} workers, {:.2}s",
        report.total_requests, report.workers, report.duration_sec
    );
    println!("{}", "=".repeat(78));
    println!(
        "{:<10} {:>8} {:>7} {:>9} {:>9} {:>9} {:>9} {:>10}",
        "pattern", "requests", "errors", "mean ms", "p50 ms", "p95 ms", "p99 ms", "req/s"
    );
    for p in &report.patterns {
        println!(
            "{:<10} {:>8} {:>7} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>10.2}",
            p.pattern,
            p.requests,
            p.errors,
            p.latency_ms.mean,
            p.latency_ms.median,
            p.latency_ms.p95,
            p.latency_ms.p99,
            p.throughput_rps
        );
    }
    println!("{}", "=".repeat(78));
}
