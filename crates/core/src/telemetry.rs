// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host and accelerator telemetry records.
//!
//! Every field is optional. `None` means the value could not be determined on
//! this instance; collectors never substitute a zero for an unknown value.

use serde::{Deserialize, Serialize};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a byte count to GiB, the unit the collector stores.
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB
}

/// Static facts about the host, captured once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemTelemetry {
    /// Total physical memory in bytes.
    pub ram_capacity_bytes: Option<u64>,
    /// Number of logical CPUs.
    pub logical_cpu_count: Option<usize>,
    /// Capacity of the root filesystem in bytes.
    pub disk_capacity_bytes: Option<u64>,
}

impl SystemTelemetry {
    /// Whether no field could be determined.
    pub fn is_empty(&self) -> bool {
        self.ram_capacity_bytes.is_none()
            && self.logical_cpu_count.is_none()
            && self.disk_capacity_bytes.is_none()
    }

    /// Total memory in GiB.
    pub fn ram_gb(&self) -> Option<f64> {
        self.ram_capacity_bytes.map(bytes_to_gib)
    }

    /// Root filesystem capacity in GiB.
    pub fn disk_space_gb(&self) -> Option<f64> {
        self.disk_capacity_bytes.map(bytes_to_gib)
    }
}

/// Accelerator identity, captured once at benchmark start.
///
/// When `present` is `false` every other field is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorInfo {
    /// Whether the compute runtime reports a usable accelerator.
    pub present: bool,
    /// Device name of the first accelerator.
    pub name: Option<String>,
    /// Number of accelerators visible to the runtime.
    pub count: Option<usize>,
    /// Driver or runtime version string.
    pub driver_version: Option<String>,
    /// Device memory capacity in bytes.
    pub memory_capacity_bytes: Option<u64>,
    /// Board power draw in watts.
    pub power_draw_watts: Option<f64>,
    /// Core temperature in degrees Celsius.
    pub temperature_celsius: Option<u32>,
}

impl AcceleratorInfo {
    /// The record for an instance without an accelerator.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Point-in-time accelerator health, sampled once at the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorMetrics {
    /// Device memory in use, in bytes.
    pub memory_used_bytes: Option<u64>,
    /// Device memory capacity, in bytes.
    pub memory_capacity_bytes: Option<u64>,
    /// GPU core utilization over the last sample period.
    pub utilization_percent: Option<u32>,
    /// Board power draw in watts.
    pub power_draw_watts: Option<f64>,
    /// Core temperature in degrees Celsius.
    pub temperature_celsius: Option<u32>,
}

impl AcceleratorMetrics {
    /// Whether no metric could be read.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
