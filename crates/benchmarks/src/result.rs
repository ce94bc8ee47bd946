// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark result types.

use chrono::{DateTime, Utc};
use fleet_bench_core::{AcceleratorInfo, AcceleratorMetrics, ResolvedConfig, SystemTelemetry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host facts and accelerator identity captured once at the start of a run.
///
/// Kept by the caller so a failed run can still report them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedTelemetry {
    /// Host facts.
    pub system: SystemTelemetry,
    /// Accelerator identity and static health.
    pub accelerator: AcceleratorInfo,
}

/// Outcome of one completed benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Unique identifier of this run.
    pub run_id: Uuid,
    /// Name of the workload that was trained.
    pub workload: String,
    /// Samples processed per second of measured time.
    pub throughput_samples_per_sec: f64,
    /// Mean wall time per batch, in milliseconds.
    pub latency_ms_per_batch: f64,
    /// Mean training loss over all measured batches.
    pub avg_loss: f64,
    /// Measured wall time, in seconds.
    pub duration_seconds: f64,
    /// `duration_seconds` truncated to whole seconds.
    pub test_duration_seconds: u64,
    /// Samples processed during measurement.
    pub total_samples: usize,
    /// Batches processed during measurement.
    pub batch_count: usize,
    /// Wall time of each epoch, in seconds.
    pub epoch_durations_seconds: Vec<f64>,
    /// Configuration the run actually used.
    pub config: ResolvedConfig,
    /// Accelerator health sampled after measurement.
    pub accelerator_metrics: AcceleratorMetrics,
    /// Accelerator identity captured before the workload loaded.
    pub accelerator_info: AcceleratorInfo,
    /// Host facts captured before the workload loaded.
    pub system_telemetry: SystemTelemetry,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Running totals accumulated over the measurement window.
///
/// Totals accumulate across epochs and are never reset between them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunTotals {
    /// Samples processed.
    pub total_samples: usize,
    /// Sum of per-batch losses.
    pub total_loss: f64,
    /// Batches processed.
    pub batch_count: usize,
}

impl RunTotals {
    /// Record one measured batch.
    pub fn record(&mut self, samples: usize, loss: f32) {
        self.total_samples += samples;
        self.total_loss += f64::from(loss);
        self.batch_count += 1;
    }

    /// Samples per second, or `0` when `duration_seconds` is not positive.
    pub fn throughput(&self, duration_seconds: f64) -> f64 {
        if duration_seconds > 0.0 {
            self.total_samples as f64 / duration_seconds
        } else {
            0.0
        }
    }

    /// Milliseconds per batch, or `0` when no batch was measured.
    pub fn latency_ms(&self, duration_seconds: f64) -> f64 {
        if self.batch_count == 0 {
            return 0.0;
        }
        duration_seconds / self.batch_count as f64 * 1000.0
    }

    /// Mean loss per batch, or `0` when no batch was measured.
    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            return 0.0;
        }
        self.total_loss / self.batch_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate() {
        let mut totals = RunTotals::default();
        totals.record(32, 2.0);
        totals.record(8, 1.0);

        assert_eq!(totals.total_samples, 40);
        assert_eq!(totals.batch_count, 2);
        assert_eq!(totals.avg_loss(), 1.5);
        assert_eq!(totals.throughput(2.0), 20.0);
        assert_eq!(totals.latency_ms(2.0), 1000.0);
    }

    #[test]
    fn test_zero_batches_guarded() {
        let totals = RunTotals::default();
        assert_eq!(totals.latency_ms(1.5), 0.0);
        assert_eq!(totals.avg_loss(), 0.0);
    }

    #[test]
    fn test_zero_duration_throughput_is_zero() {
        let mut totals = RunTotals::default();
        totals.record(10, 0.5);
        assert_eq!(totals.throughput(0.0), 0.0);
    }

    #[test]
    fn test_sub_second_duration_uses_unrounded_value() {
        let mut totals = RunTotals::default();
        totals.record(100, 0.5);
        assert_eq!(totals.throughput(0.25), 400.0);
        assert_eq!(totals.latency_ms(0.25), 250.0);
    }
}
