// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark error types.

use thiserror::Error;

use crate::workload::WorkloadError;

/// Errors that abort a benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The configuration was rejected before anything ran.
    #[error("Invalid benchmark configuration")]
    Config(#[source] fleet_bench_core::Error),

    /// The workload could not be instantiated on the target device.
    #[error("Failed to load workload '{name}'")]
    Load {
        /// Loader name.
        name: String,
        /// Underlying failure.
        #[source]
        source: WorkloadError,
    },

    /// A warmup step failed.
    #[error("Warmup step {step} failed")]
    Warmup {
        /// Zero-based warmup step.
        step: usize,
        /// Underlying failure.
        #[source]
        source: WorkloadError,
    },

    /// A measured training step failed.
    #[error("Training step failed at epoch {epoch}, batch {batch}")]
    Step {
        /// Zero-based epoch.
        epoch: usize,
        /// Zero-based batch within the epoch.
        batch: usize,
        /// Underlying failure.
        #[source]
        source: WorkloadError,
    },

    /// The device synchronization barrier failed.
    #[error("Device synchronization failed")]
    Sync(#[source] fleet_bench_core::Error),
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;
