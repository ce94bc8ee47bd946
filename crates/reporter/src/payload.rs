// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! The JSON document submitted to the collector.
//!
//! Every key is always serialized. Values that could not be determined are
//! sent as explicit `null`; the collector tolerates nulls but not missing keys.

use fleet_bench_benchmarks::{BenchmarkResult, CapturedTelemetry};
use fleet_bench_core::telemetry::bytes_to_gib;
use fleet_bench_core::{AcceleratorInfo, BenchmarkConfig, SystemTelemetry};
use serde::{Deserialize, Serialize};

/// One submission describing one benchmark attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Instance under test.
    pub instance_id: String,
    /// Collector API key, also sent as a header.
    pub api_key: String,
    /// Name of the test that ran.
    pub test_type: String,
    /// Samples per batch.
    pub batch_size: usize,
    /// Epochs requested.
    pub num_epochs: usize,
    /// Image edge in pixels.
    pub image_size: usize,
    /// Same value as `throughput_samples_per_sec`; every sample is an image.
    pub throughput_images_per_sec: Option<f64>,
    /// Samples per second of measured time.
    pub throughput_samples_per_sec: Option<f64>,
    /// Milliseconds per batch.
    pub latency_ms: Option<f64>,
    /// Accelerator utilization at the end of the run.
    pub gpu_utilization_percent: Option<u32>,
    /// Accelerator memory in use, GiB.
    pub memory_used_gb: Option<f64>,
    /// Accelerator memory capacity, GiB.
    pub memory_total_gb: Option<f64>,
    /// Board power draw, watts.
    pub power_draw_watts: Option<f64>,
    /// Core temperature, degrees Celsius.
    pub temperature_celsius: Option<u32>,
    /// Mean training loss.
    pub loss: Option<f64>,
    /// Measured duration in whole seconds.
    pub test_duration_seconds: Option<u64>,
    /// Host and accelerator specs used to update the instance record.
    pub system_telemetry: TelemetryPayload,
    /// The full result, or the error object for failed runs.
    pub raw_results: RawResults,
    /// Failure text; `null` on success.
    pub error: Option<String>,
    /// Failure text the collector stores on the test; `null` on success.
    pub error_message: Option<String>,
}

/// Nested instance specs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Host memory, GiB.
    pub ram_gb: Option<f64>,
    /// Logical CPUs.
    pub cpu_count: Option<usize>,
    /// Root filesystem capacity, GiB.
    pub disk_space_gb: Option<f64>,
    /// Accelerator name.
    pub gpu_name: Option<String>,
    /// Accelerator count.
    pub gpu_count: Option<usize>,
    /// Accelerator driver or runtime version.
    pub cuda_version: Option<String>,
}

impl TelemetryPayload {
    /// Project host telemetry and accelerator identity.
    pub fn new(system: &SystemTelemetry, accelerator: &AcceleratorInfo) -> Self {
        Self {
            ram_gb: system.ram_gb(),
            cpu_count: system.logical_cpu_count,
            disk_space_gb: system.disk_space_gb(),
            gpu_name: accelerator.name.clone(),
            gpu_count: accelerator.count,
            cuda_version: accelerator.driver_version.clone(),
        }
    }
}

/// Contents of `raw_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResults {
    /// A completed run.
    Completed(Box<BenchmarkResult>),
    /// A run that failed before producing a result.
    Failed {
        /// Failure text.
        error: String,
    },
}

impl SubmissionPayload {
    /// Payload for a completed run.
    pub fn completed(
        instance_id: impl Into<String>,
        api_key: impl Into<String>,
        test_type: impl Into<String>,
        result: &BenchmarkResult,
    ) -> Self {
        let metrics = &result.accelerator_metrics;
        let info = &result.accelerator_info;

        Self {
            instance_id: instance_id.into(),
            api_key: api_key.into(),
            test_type: test_type.into(),
            batch_size: result.config.batch_size,
            num_epochs: result.config.num_epochs,
            image_size: result.config.image_size,
            throughput_images_per_sec: Some(result.throughput_samples_per_sec),
            throughput_samples_per_sec: Some(result.throughput_samples_per_sec),
            latency_ms: Some(result.latency_ms_per_batch),
            gpu_utilization_percent: metrics.utilization_percent,
            memory_used_gb: metrics.memory_used_bytes.map(bytes_to_gib),
            memory_total_gb: metrics
                .memory_capacity_bytes
                .or(info.memory_capacity_bytes)
                .map(bytes_to_gib),
            power_draw_watts: metrics.power_draw_watts.or(info.power_draw_watts),
            temperature_celsius: metrics.temperature_celsius.or(info.temperature_celsius),
            loss: Some(result.avg_loss),
            test_duration_seconds: Some(result.test_duration_seconds),
            system_telemetry: TelemetryPayload::new(&result.system_telemetry, info),
            raw_results: RawResults::Completed(Box::new(result.clone())),
            error: None,
            error_message: None,
        }
    }

    /// Payload for a run that failed. Metric fields are `null`; instance
    /// specs come from whatever telemetry was captured before the failure.
    pub fn failed(
        instance_id: impl Into<String>,
        api_key: impl Into<String>,
        test_type: impl Into<String>,
        config: &BenchmarkConfig,
        captured: &CapturedTelemetry,
        error_message: impl Into<String>,
    ) -> Self {
        let error_message = error_message.into();

        Self {
            instance_id: instance_id.into(),
            api_key: api_key.into(),
            test_type: test_type.into(),
            batch_size: config.batch_size,
            num_epochs: config.num_epochs,
            image_size: config.image_size,
            throughput_images_per_sec: None,
            throughput_samples_per_sec: None,
            latency_ms: None,
            gpu_utilization_percent: None,
            memory_used_gb: None,
            memory_total_gb: None,
            power_draw_watts: None,
            temperature_celsius: None,
            loss: None,
            test_duration_seconds: None,
            system_telemetry: TelemetryPayload::new(&captured.system, &captured.accelerator),
            raw_results: RawResults::Failed {
                error: error_message.clone(),
            },
            error: Some(error_message.clone()),
            error_message: Some(error_message),
        }
    }

    /// Whether this payload reports a failed run.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
