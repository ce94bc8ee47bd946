// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Vendor metrics interface and its NVML implementation.
//!
//! NVML is loaded at runtime. On instances without the NVIDIA driver,
//! [`NvmlMetrics::open`] fails and accelerator health fields stay null for
//! the rest of the run. When it opens, the same library handle also backs
//! [`NvmlRuntime`], the presence and identity source.

use std::sync::Arc;

use fleet_bench_core::probe::{ProbeError, ProbeResult};
use fleet_bench_core::ComputeRuntime;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::{cuda_driver_version_major, cuda_driver_version_minor, Nvml};
use tracing::debug;

/// Device memory as reported by the vendor library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorMemory {
    /// Total device memory in bytes.
    pub total_bytes: u64,
    /// Device memory in use by all processes, in bytes.
    pub used_bytes: u64,
}

/// Read-only accelerator health metrics from an opened vendor handle.
///
/// Each read is independent: a metric unsupported on one SKU must not
/// affect the others.
#[cfg_attr(test, mockall::automock)]
pub trait VendorMetrics {
    /// Memory capacity and usage.
    fn memory_info(&self, index: u32) -> ProbeResult<VendorMemory>;

    /// Board power draw in milliwatts.
    fn power_usage_milliwatts(&self, index: u32) -> ProbeResult<u32>;

    /// Core temperature in degrees Celsius.
    fn temperature_celsius(&self, index: u32) -> ProbeResult<u32>;

    /// Core utilization over the driver's last sample period, in percent.
    fn utilization_percent(&self, index: u32) -> ProbeResult<u32>;
}

/// NVML-backed vendor metrics. The library is shut down when dropped.
pub struct NvmlMetrics {
    nvml: Arc<Nvml>,
}

impl NvmlMetrics {
    /// Load and initialize NVML.
    pub fn open() -> Result<Self, NvmlError> {
        Ok(Self {
            nvml: Arc::new(Nvml::init()?),
        })
    }

    /// Number of devices NVML can see.
    pub fn device_count(&self) -> ProbeResult<u32> {
        self.nvml.device_count().map_err(nvml_failure)
    }

    /// A compute runtime view over the same library handle.
    pub fn runtime(&self) -> NvmlRuntime {
        NvmlRuntime {
            nvml: Arc::clone(&self.nvml),
        }
    }
}

impl std::fmt::Debug for NvmlMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvmlMetrics").finish_non_exhaustive()
    }
}

impl VendorMetrics for NvmlMetrics {
    fn memory_info(&self, index: u32) -> ProbeResult<VendorMemory> {
        let device = self.nvml.device_by_index(index).map_err(nvml_failure)?;
        let memory = device.memory_info().map_err(nvml_failure)?;
        Ok(VendorMemory {
            total_bytes: memory.total,
            used_bytes: memory.used,
        })
    }

    fn power_usage_milliwatts(&self, index: u32) -> ProbeResult<u32> {
        let device = self.nvml.device_by_index(index).map_err(nvml_failure)?;
        device.power_usage().map_err(nvml_failure)
    }

    fn temperature_celsius(&self, index: u32) -> ProbeResult<u32> {
        let device = self.nvml.device_by_index(index).map_err(nvml_failure)?;
        device
            .temperature(TemperatureSensor::Gpu)
            .map_err(nvml_failure)
    }

    fn utilization_percent(&self, index: u32) -> ProbeResult<u32> {
        let device = self.nvml.device_by_index(index).map_err(nvml_failure)?;
        device
            .utilization_rates()
            .map(|rates| rates.gpu)
            .map_err(nvml_failure)
    }
}

/// Accelerator presence and identity from NVML.
///
/// NVML observes devices but dispatches no work, so it has no allocator view
/// and its barrier returns immediately. Workloads that run on the device pair
/// their own runtime with a loader for it.
pub struct NvmlRuntime {
    nvml: Arc<Nvml>,
}

impl std::fmt::Debug for NvmlRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvmlRuntime").finish_non_exhaustive()
    }
}

impl ComputeRuntime for NvmlRuntime {
    fn is_available(&self) -> bool {
        self.device_count() > 0
    }

    fn device_count(&self) -> usize {
        match self.nvml.device_count() {
            Ok(count) => count as usize,
            Err(error) => {
                debug!(%error, "NVML device count unavailable");
                0
            }
        }
    }

    fn device_name(&self, ordinal: usize) -> Option<String> {
        let index = u32::try_from(ordinal).ok()?;
        let name = self
            .nvml
            .device_by_index(index)
            .and_then(|device| device.name());
        best_effort_nvml("device_name", name)
    }

    fn runtime_version(&self) -> Option<String> {
        let cuda = self.nvml.sys_cuda_driver_version().map(|version| {
            format!(
                "{}.{}",
                cuda_driver_version_major(version),
                cuda_driver_version_minor(version)
            )
        });
        best_effort_nvml("cuda_driver_version", cuda)
            .or_else(|| best_effort_nvml("driver_version", self.nvml.sys_driver_version()))
    }

    fn memory_allocated(&self, _ordinal: usize) -> Option<u64> {
        None
    }

    fn memory_total(&self, ordinal: usize) -> Option<u64> {
        let index = u32::try_from(ordinal).ok()?;
        let total = self
            .nvml
            .device_by_index(index)
            .and_then(|device| device.memory_info())
            .map(|memory| memory.total);
        best_effort_nvml("memory_total", total)
    }

    fn synchronize(&self, _ordinal: usize) -> fleet_bench_core::Result<()> {
        Ok(())
    }
}

fn best_effort_nvml<T>(field: &'static str, result: Result<T, NvmlError>) -> Option<T> {
    fleet_bench_core::probe::best_effort(field, result.map_err(nvml_failure))
}

fn nvml_failure(error: NvmlError) -> ProbeError {
    match error {
        NvmlError::NotSupported => ProbeError::unavailable("not supported on this device"),
        NvmlError::NoPermission => ProbeError::unavailable("insufficient permissions"),
        other => ProbeError::failed(other.to_string()),
    }
}
