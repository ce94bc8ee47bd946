// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Timed training benchmark for Fleet Bench.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use fleet_bench_benchmarks::{BenchmarkRunner, PooledLinearLoader};
//! use fleet_bench_collector::{AcceleratorMonitor, TelemetryCollector};
//! use fleet_bench_core::{BenchmarkConfig, Capabilities, ComputeRuntime, HostRuntime};
//!
//! let runtime: Arc<dyn ComputeRuntime> = Arc::new(HostRuntime::new());
//! let runner = BenchmarkRunner::new(
//!     Arc::clone(&runtime),
//!     TelemetryCollector::new(&Capabilities::none()),
//!     AcceleratorMonitor::new(runtime, None),
//!     Box::new(PooledLinearLoader),
//! );
//!
//! let result = runner.run(&BenchmarkConfig::default())?;
//! println!("{:.1} samples/s", result.throughput_samples_per_sec);
//! # Ok::<(), fleet_bench_benchmarks::BenchError>(())
//! ```
//!
//! # Modules
//!
//! - [`runner`] - the benchmark state machine
//! - [`workload`] - the workload seam and the host reference workload
//! - [`dataset`] - the synthetic dataset and its batch loader
//! - [`result`] - the result record and running totals
//! - [`io`] - the local result archive
//! - [`markdown`] - markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod dataset;
pub mod error;
pub mod io;
pub mod markdown;
pub mod result;
pub mod runner;
pub mod workload;

pub use error::{BenchError, Result};
pub use result::{BenchmarkResult, CapturedTelemetry, RunTotals};
pub use runner::BenchmarkRunner;
pub use workload::{PooledLinearLoader, Workload, WorkloadError, WorkloadLoader, WorkloadSpec};
