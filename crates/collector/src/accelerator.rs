// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Accelerator presence, identity and health.
//!
//! Presence and identity come from the [`ComputeRuntime`]. Extended fields
//! (memory capacity, power, temperature, utilization) come from an optional
//! [`VendorMetrics`] handle owned by the monitor for its whole lifetime.

use std::sync::Arc;

use fleet_bench_core::probe::best_effort;
use fleet_bench_core::{AcceleratorInfo, AcceleratorMetrics, ComputeRuntime};
use tracing::debug;

use crate::vendor::VendorMetrics;

/// Accelerator the monitor reports on.
const ORDINAL: usize = 0;

/// Reads accelerator identity and point-in-time health. Never fails.
pub struct AcceleratorMonitor {
    runtime: Arc<dyn ComputeRuntime>,
    vendor: Option<Box<dyn VendorMetrics>>,
}

impl AcceleratorMonitor {
    /// Create a monitor. `vendor` is the handle opened during capability
    /// detection; `None` leaves extended fields absent for the run.
    pub fn new(runtime: Arc<dyn ComputeRuntime>, vendor: Option<Box<dyn VendorMetrics>>) -> Self {
        Self { runtime, vendor }
    }

    /// Whether extended fields can be read.
    pub fn has_vendor_metrics(&self) -> bool {
        self.vendor.is_some()
    }

    /// Static identity of the accelerator, or the absent record.
    pub fn detect(&self) -> AcceleratorInfo {
        if !self.runtime.is_available() {
            debug!("Compute runtime reports no accelerator");
            return AcceleratorInfo::absent();
        }

        let mut info = AcceleratorInfo {
            present: true,
            name: self.runtime.device_name(ORDINAL),
            count: Some(self.runtime.device_count()),
            driver_version: self.runtime.runtime_version(),
            ..AcceleratorInfo::default()
        };

        if let Some(vendor) = &self.vendor {
            let index = ORDINAL as u32;
            info.memory_capacity_bytes =
                best_effort("memory_capacity", vendor.memory_info(index)).map(|m| m.total_bytes);
            info.power_draw_watts = best_effort("power_draw", vendor.power_usage_milliwatts(index))
                .map(milliwatts_to_watts);
            info.temperature_celsius =
                best_effort("temperature", vendor.temperature_celsius(index));
        }

        info
    }

    /// Dynamic metrics at this instant, or the empty record.
    pub fn sample(&self) -> AcceleratorMetrics {
        if !self.runtime.is_available() {
            return AcceleratorMetrics::default();
        }

        let mut metrics = AcceleratorMetrics {
            memory_used_bytes: self.runtime.memory_allocated(ORDINAL),
            memory_capacity_bytes: self.runtime.memory_total(ORDINAL),
            ..AcceleratorMetrics::default()
        };

        if let Some(vendor) = &self.vendor {
            let index = ORDINAL as u32;
            if metrics.memory_used_bytes.is_none() || metrics.memory_capacity_bytes.is_none() {
                if let Some(memory) = best_effort("memory", vendor.memory_info(index)) {
                    metrics.memory_used_bytes.get_or_insert(memory.used_bytes);
                    metrics.memory_capacity_bytes.get_or_insert(memory.total_bytes);
                }
            }
            metrics.utilization_percent =
                best_effort("utilization", vendor.utilization_percent(index));
            metrics.power_draw_watts = best_effort("power_draw", vendor.power_usage_milliwatts(index))
                .map(milliwatts_to_watts);
            metrics.temperature_celsius =
                best_effort("temperature", vendor.temperature_celsius(index));
        }

        metrics
    }
}

impl std::fmt::Debug for AcceleratorMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratorMonitor")
            .field("has_vendor_metrics", &self.has_vendor_metrics())
            .finish_non_exhaustive()
    }
}

fn milliwatts_to_watts(milliwatts: u32) -> f64 {
    f64::from(milliwatts) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::{MockVendorMetrics, VendorMemory};
    use fleet_bench_core::probe::ProbeError;
    use fleet_bench_core::MockComputeRuntime;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn absent_runtime() -> MockComputeRuntime {
        let mut runtime = MockComputeRuntime::new();
        runtime.expect_is_available().return_const(false);
        runtime.expect_device_name().never();
        runtime.expect_memory_allocated().never();
        runtime
    }

    fn present_runtime(allocator_view: bool) -> MockComputeRuntime {
        let mut runtime = MockComputeRuntime::new();
        runtime.expect_is_available().return_const(true);
        runtime.expect_device_count().return_const(2usize);
        runtime
            .expect_device_name()
            .returning(|_| Some("NVIDIA H100 80GB HBM3".to_string()));
        runtime
            .expect_runtime_version()
            .returning(|| Some("12.4".to_string()));
        runtime
            .expect_memory_allocated()
            .returning(move |_| allocator_view.then_some(3 * GIB));
        runtime
            .expect_memory_total()
            .returning(move |_| allocator_view.then_some(80 * GIB));
        runtime
    }

    fn healthy_vendor() -> MockVendorMetrics {
        let mut vendor = MockVendorMetrics::new();
        vendor.expect_memory_info().returning(|_| {
            Ok(VendorMemory {
                total_bytes: 81 * GIB,
                used_bytes: 5 * GIB,
            })
        });
        vendor.expect_power_usage_milliwatts().returning(|_| Ok(312_500));
        vendor.expect_temperature_celsius().returning(|_| Ok(61));
        vendor.expect_utilization_percent().returning(|_| Ok(97));
        vendor
    }

    #[test]
    fn test_absent_accelerator_short_circuits() {
        let mut vendor = MockVendorMetrics::new();
        vendor.expect_memory_info().never();
        vendor.expect_power_usage_milliwatts().never();
        vendor.expect_temperature_celsius().never();
        vendor.expect_utilization_percent().never();

        let monitor = AcceleratorMonitor::new(Arc::new(absent_runtime()), Some(Box::new(vendor)));

        assert_eq!(monitor.detect(), AcceleratorInfo::absent());
        assert!(monitor.sample().is_empty());
    }

    #[test]
    fn test_detect_identity_from_runtime() {
        let monitor = AcceleratorMonitor::new(Arc::new(present_runtime(true)), None);

        let info = monitor.detect();
        assert!(info.present);
        assert_eq!(info.name.as_deref(), Some("NVIDIA H100 80GB HBM3"));
        assert_eq!(info.count, Some(2));
        assert_eq!(info.driver_version.as_deref(), Some("12.4"));
        assert!(info.memory_capacity_bytes.is_none());
        assert!(info.power_draw_watts.is_none());
        assert!(info.temperature_celsius.is_none());
    }

    #[test]
    fn test_detect_extended_fields_from_vendor() {
        let monitor = AcceleratorMonitor::new(
            Arc::new(present_runtime(true)),
            Some(Box::new(healthy_vendor())),
        );

        let info = monitor.detect();
        assert_eq!(info.memory_capacity_bytes, Some(81 * GIB));
        assert_eq!(info.power_draw_watts, Some(312.5));
        assert_eq!(info.temperature_celsius, Some(61));
    }

    #[test]
    fn test_unsupported_power_does_not_suppress_temperature() {
        let mut vendor = MockVendorMetrics::new();
        vendor
            .expect_memory_info()
            .returning(|_| Err(ProbeError::failed("driver timeout")));
        vendor
            .expect_power_usage_milliwatts()
            .returning(|_| Err(ProbeError::unavailable("not supported on this device")));
        vendor.expect_temperature_celsius().returning(|_| Ok(55));
        vendor.expect_utilization_percent().returning(|_| Ok(40));

        let monitor =
            AcceleratorMonitor::new(Arc::new(present_runtime(false)), Some(Box::new(vendor)));

        let info = monitor.detect();
        assert!(info.power_draw_watts.is_none());
        assert!(info.memory_capacity_bytes.is_none());
        assert_eq!(info.temperature_celsius, Some(55));

        let metrics = monitor.sample();
        assert!(metrics.power_draw_watts.is_none());
        assert!(metrics.memory_used_bytes.is_none());
        assert_eq!(metrics.temperature_celsius, Some(55));
        assert_eq!(metrics.utilization_percent, Some(40));
    }

    #[test]
    fn test_sample_prefers_runtime_allocator_memory() {
        let monitor = AcceleratorMonitor::new(
            Arc::new(present_runtime(true)),
            Some(Box::new(healthy_vendor())),
        );

        let metrics = monitor.sample();
        assert_eq!(metrics.memory_used_bytes, Some(3 * GIB));
        assert_eq!(metrics.memory_capacity_bytes, Some(80 * GIB));
        assert_eq!(metrics.utilization_percent, Some(97));
        assert_eq!(metrics.power_draw_watts, Some(312.5));
        assert_eq!(metrics.temperature_celsius, Some(61));
    }

    #[test]
    fn test_sample_falls_back_to_vendor_memory() {
        let monitor = AcceleratorMonitor::new(
            Arc::new(present_runtime(false)),
            Some(Box::new(healthy_vendor())),
        );

        let metrics = monitor.sample();
        assert_eq!(metrics.memory_used_bytes, Some(5 * GIB));
        assert_eq!(metrics.memory_capacity_bytes, Some(81 * GIB));
    }

    #[test]
    fn test_without_vendor_only_runtime_metrics() {
        let monitor = AcceleratorMonitor::new(Arc::new(present_runtime(true)), None);
        assert!(!monitor.has_vendor_metrics());

        let metrics = monitor.sample();
        assert_eq!(metrics.memory_used_bytes, Some(3 * GIB));
        assert!(metrics.utilization_percent.is_none());
        assert!(metrics.power_draw_watts.is_none());
        assert!(metrics.temperature_celsius.is_none());
    }

    #[test]
    fn test_milliwatts_to_watts() {
        assert_eq!(milliwatts_to_watts(250_000), 250.0);
        assert_eq!(milliwatts_to_watts(0), 0.0);
    }
}
