// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface for the Fleet Bench agent.
//!
//! Every flag can also be set through a `FLEET_BENCH_*` environment variable
//! or a `.env` file in the working directory.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod agent;

pub use agent::{Agent, AgentOutcome};

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use fleet_bench_benchmarks::{BenchmarkRunner, PooledLinearLoader};
use fleet_bench_collector::{
    detect_environment, AcceleratorMonitor, DetectedEnvironment, TelemetryCollector,
};
use fleet_bench_core::config::{DEFAULT_BATCH_SIZE, DEFAULT_IMAGE_SIZE, DEFAULT_NUM_EPOCHS};
use fleet_bench_core::{BenchmarkConfig, Device};
use fleet_bench_reporter::{ReporterConfig, ResultsReporter};
use tracing_subscriber::EnvFilter;

/// Fleet Bench agent: benchmark this instance and report to the collector.
#[derive(Parser, Debug)]
#[command(name = "fleet-bench-agent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Instance under test.
    #[arg(long, env = "FLEET_BENCH_INSTANCE_ID", alias = "gpu-instance-id")]
    pub instance_id: String,

    /// Collector endpoint receiving results.
    #[arg(long, env = "FLEET_BENCH_ENDPOINT_URL", alias = "api-url")]
    pub endpoint_url: String,

    /// Collector API key.
    #[arg(long, env = "FLEET_BENCH_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Samples per training batch.
    #[arg(long, env = "FLEET_BENCH_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Passes over the dataset inside the measurement window.
    #[arg(long, env = "FLEET_BENCH_NUM_EPOCHS", default_value_t = DEFAULT_NUM_EPOCHS)]
    pub num_epochs: usize,

    /// Square image edge in pixels.
    #[arg(long, env = "FLEET_BENCH_IMAGE_SIZE", default_value_t = DEFAULT_IMAGE_SIZE)]
    pub image_size: usize,

    /// Device to run on: cuda or cpu (default: cuda when available).
    #[arg(long, env = "FLEET_BENCH_DEVICE")]
    pub device: Option<Device>,

    /// Test type reported to the collector (default: the workload name).
    #[arg(long, env = "FLEET_BENCH_TEST_TYPE")]
    pub test_type: Option<String>,

    /// Seed for the synthetic dataset and weight initialization.
    #[arg(long, env = "FLEET_BENCH_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Also write each payload and a markdown summary under this directory.
    #[arg(short, long, env = "FLEET_BENCH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, env = "FLEET_BENCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl Cli {
    /// Benchmark parameters from the arguments.
    pub fn benchmark_config(&self) -> BenchmarkConfig {
        BenchmarkConfig {
            batch_size: self.batch_size,
            num_epochs: self.num_epochs,
            image_size: self.image_size,
            device: self.device,
            seed: self.seed,
        }
    }

    /// Submission target and identity from the arguments.
    pub fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig::new(&self.endpoint_url, &self.instance_id, &self.api_key)
    }
}

/// Install the global tracing subscriber, writing to stdout.
///
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        eprintln!("Failed to install logger: {}", e);
    }
}

/// Wire the reference workload to the detected runtime and telemetry sources.
pub fn build_runner(environment: DetectedEnvironment) -> BenchmarkRunner {
    let DetectedEnvironment {
        capabilities,
        runtime,
        vendor_metrics,
    } = environment;
    BenchmarkRunner::new(
        Arc::clone(&runtime),
        TelemetryCollector::new(&capabilities),
        AcceleratorMonitor::new(runtime, vendor_metrics),
        Box::new(PooledLinearLoader),
    )
}

/// Run the agent with the process arguments.
pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let reporter = match ResultsReporter::new(cli.reporter_config()) {
        Ok(reporter) => reporter,
        Err(e) => {
            eprintln!("{} {:?}", "Error:".red().bold(), anyhow::Error::new(e));
            return ExitCode::FAILURE;
        }
    };

    let runner = build_runner(detect_environment());

    Agent::new(runner, cli.benchmark_config(), reporter)
        .with_test_type(cli.test_type)
        .with_output(cli.output)
        .execute()
        .exit_code()
}
