// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Timed benchmark execution.
//!
//! A run moves through `INIT -> TELEMETRY_CAPTURE -> MODEL_LOAD -> WARMUP ->
//! MEASURE -> AGGREGATE`. On an accelerator, a synchronization barrier runs
//! right before the measurement clock starts and after every epoch, so the
//! clock stops only once all dispatched work has completed.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use fleet_bench_collector::{AcceleratorMonitor, TelemetryCollector};
use fleet_bench_core::{BenchmarkConfig, ComputeRuntime, Device};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dataset::{DataLoader, SyntheticDataset, DATASET_SIZE, NUM_CLASSES};
use crate::error::{BenchError, Result};
use crate::result::{BenchmarkResult, CapturedTelemetry, RunTotals};
use crate::workload::{WorkloadLoader, WorkloadSpec};

/// Untimed steps run on the first batch before measurement.
pub const WARMUP_STEPS: usize = 5;

/// Progress is logged every this many batches.
pub const LOG_EVERY_BATCHES: usize = 10;

/// Accelerator ordinal the benchmark runs on.
const ORDINAL: usize = 0;

/// Runs the training benchmark and aggregates its measurements.
pub struct BenchmarkRunner {
    runtime: Arc<dyn ComputeRuntime>,
    collector: TelemetryCollector,
    monitor: AcceleratorMonitor,
    loader: Box<dyn WorkloadLoader>,
    dataset_size: usize,
}

impl BenchmarkRunner {
    /// Create a runner over the full-size synthetic dataset.
    pub fn new(
        runtime: Arc<dyn ComputeRuntime>,
        collector: TelemetryCollector,
        monitor: AcceleratorMonitor,
        loader: Box<dyn WorkloadLoader>,
    ) -> Self {
        Self {
            runtime,
            collector,
            monitor,
            loader,
            dataset_size: DATASET_SIZE,
        }
    }

    /// Override the number of synthetic samples.
    pub fn with_dataset_size(mut self, dataset_size: usize) -> Self {
        self.dataset_size = dataset_size;
        self
    }

    /// Name of the workload this runner trains.
    pub fn workload_name(&self) -> &str {
        self.loader.name()
    }

    /// Pick the device a run will use.
    ///
    /// An accelerator request falls back to the host when no accelerator is
    /// detected or the workload has no accelerator build.
    pub fn resolve_device(&self, requested: Option<Device>) -> Device {
        let available = self.runtime.is_available();
        let buildable = self.loader.supports(Device::Accelerator);
        match requested {
            Some(Device::Accelerator) if !available => {
                info!("Accelerator requested but none detected, falling back to cpu");
                Device::Host
            }
            Some(Device::Accelerator) if !buildable => {
                info!(
                    workload = self.loader.name(),
                    "Workload cannot run on the accelerator, falling back to cpu"
                );
                Device::Host
            }
            Some(device) => device,
            None if available && buildable => Device::Accelerator,
            None => Device::Host,
        }
    }

    /// Collect host telemetry and detect the accelerator.
    pub fn capture(&self) -> CapturedTelemetry {
        let captured = CapturedTelemetry {
            system: self.collector.collect(),
            accelerator: self.monitor.detect(),
        };
        if let Some(name) = &captured.accelerator.name {
            info!(accelerator = %name, count = ?captured.accelerator.count, "Accelerator detected");
        }
        captured
    }

    /// Capture telemetry, then execute one benchmark run.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, a workload that cannot load, any
    /// failed training step, or a failed synchronization barrier.
    pub fn run(&self, config: &BenchmarkConfig) -> Result<BenchmarkResult> {
        self.run_captured(config, self.capture())
    }

    /// Execute one benchmark run with telemetry already captured by
    /// [`BenchmarkRunner::capture`].
    ///
    /// # Errors
    ///
    /// As [`BenchmarkRunner::run`].
    pub fn run_captured(
        &self,
        config: &BenchmarkConfig,
        captured: CapturedTelemetry,
    ) -> Result<BenchmarkResult> {
        config.validate().map_err(BenchError::Config)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let device = self.resolve_device(config.device);
        let resolved = config.resolve(device);
        info!(
            %run_id,
            %device,
            batch_size = config.batch_size,
            num_epochs = config.num_epochs,
            image_size = config.image_size,
            "Starting benchmark"
        );

        let CapturedTelemetry {
            system: system_telemetry,
            accelerator: accelerator_info,
        } = captured;

        let spec = WorkloadSpec {
            image_size: config.image_size,
            num_classes: NUM_CLASSES,
            device,
            seed: config.seed,
        };
        let mut workload = self.loader.load(&spec).map_err(|source| BenchError::Load {
            name: self.loader.name().to_string(),
            source,
        })?;
        let dataset = SyntheticDataset::new(self.dataset_size, config.image_size, config.seed);
        let mut data = DataLoader::new(&dataset, config.batch_size, config.seed);
        debug!(
            workload = workload.name(),
            samples = dataset.len(),
            batches_per_epoch = data.num_batches(),
            "Workload loaded"
        );

        if let Some(batch) = data.first_batch() {
            for step in 0..WARMUP_STEPS {
                workload
                    .train_step(&batch)
                    .map_err(|source| BenchError::Warmup { step, source })?;
            }
        }
        self.barrier(device)?;
        debug!(steps = WARMUP_STEPS, "Warmup complete");

        let mut totals = RunTotals::default();
        let mut epoch_durations_seconds = Vec::with_capacity(config.num_epochs);
        let measure_start = Instant::now();

        for epoch in 0..config.num_epochs {
            let epoch_start = Instant::now();
            for (index, batch) in data.epoch().enumerate() {
                let loss = workload
                    .train_step(&batch)
                    .map_err(|source| BenchError::Step {
                        epoch,
                        batch: index,
                        source,
                    })?;
                totals.record(batch.len(), loss);
                if index % LOG_EVERY_BATCHES == 0 {
                    info!(epoch, batch = index, loss, "Training progress");
                }
            }
            self.barrier(device)?;
            let seconds = epoch_start.elapsed().as_secs_f64();
            epoch_durations_seconds.push(seconds);
            info!(epoch, seconds, "Epoch complete");
        }

        let duration_seconds = measure_start.elapsed().as_secs_f64();
        let accelerator_metrics = self.monitor.sample();

        let result = BenchmarkResult {
            run_id,
            workload: workload.name().to_string(),
            throughput_samples_per_sec: totals.throughput(duration_seconds),
            latency_ms_per_batch: totals.latency_ms(duration_seconds),
            avg_loss: totals.avg_loss(),
            duration_seconds,
            test_duration_seconds: duration_seconds as u64,
            total_samples: totals.total_samples,
            batch_count: totals.batch_count,
            epoch_durations_seconds,
            config: resolved,
            accelerator_metrics,
            accelerator_info,
            system_telemetry,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            throughput = result.throughput_samples_per_sec,
            latency_ms = result.latency_ms_per_batch,
            avg_loss = result.avg_loss,
            duration_seconds = result.duration_seconds,
            total_samples = result.total_samples,
            "Benchmark complete"
        );

        Ok(result)
    }

    fn barrier(&self, device: Device) -> Result<()> {
        if device.is_accelerator() {
            self.runtime.synchronize(ORDINAL).map_err(BenchError::Sync)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BenchmarkRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkRunner")
            .field("workload", &self.loader.name())
            .field("dataset_size", &self.dataset_size)
            .finish_non_exhaustive()
    }
}
