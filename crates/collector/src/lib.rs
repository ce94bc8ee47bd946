// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Telemetry collection for Fleet Bench.
//!
//! - [`host`] - static host facts (RAM, CPUs, disk) through probe chains
//! - [`accelerator`] - accelerator identity and point-in-time health
//! - [`vendor`] - the vendor metrics interface and its NVML implementation
//!
//! Optional libraries are probed exactly once, by [`detect_environment`].

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod accelerator;
pub mod host;
pub mod vendor;

pub use accelerator::AcceleratorMonitor;
pub use host::TelemetryCollector;
pub use vendor::{NvmlMetrics, NvmlRuntime, VendorMemory, VendorMetrics};

use std::sync::Arc;

use fleet_bench_core::{Capabilities, ComputeRuntime, HostRuntime};
use tracing::{debug, info};

/// Capabilities detected at startup, with the runtime and vendor handle
/// that go with them.
pub struct DetectedEnvironment {
    /// Which optional facilities are available.
    pub capabilities: Capabilities,
    /// Presence and identity source: NVML when it opened, the host otherwise.
    pub runtime: Arc<dyn ComputeRuntime>,
    /// The opened vendor handle. Hand it to the [`AcceleratorMonitor`].
    pub vendor_metrics: Option<Box<dyn VendorMetrics>>,
}

impl std::fmt::Debug for DetectedEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectedEnvironment")
            .field("capabilities", &self.capabilities)
            .field("accelerator_available", &self.runtime.is_available())
            .finish_non_exhaustive()
    }
}

/// Probe the optional telemetry libraries. Never fails.
pub fn detect_environment() -> DetectedEnvironment {
    let (runtime, vendor_metrics): (Arc<dyn ComputeRuntime>, Option<Box<dyn VendorMetrics>>) =
        match NvmlMetrics::open() {
            Ok(nvml) => {
                match nvml.device_count() {
                    Ok(count) => debug!(count, "NVML initialized"),
                    Err(error) => debug!(%error, "NVML initialized but device count unavailable"),
                }
                (Arc::new(nvml.runtime()), Some(Box::new(nvml)))
            }
            Err(error) => {
                debug!(%error, "NVML unavailable, accelerator fields will be null");
                (Arc::new(HostRuntime::new()), None)
            }
        };

    let capabilities = Capabilities {
        has_vendor_metrics: vendor_metrics.is_some(),
        has_host_introspection: sysinfo::IS_SUPPORTED_SYSTEM,
    };

    info!(
        vendor_metrics = capabilities.has_vendor_metrics,
        host_introspection = capabilities.has_host_introspection,
        "Environment capabilities detected"
    );

    DetectedEnvironment {
        capabilities,
        runtime,
        vendor_metrics,
    }
}
