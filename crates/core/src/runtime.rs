// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Compute runtime seam.
//!
//! The compute runtime is the authority on accelerator presence and identity,
//! and it owns the synchronization barrier used around timed regions. The
//! agent ships [`HostRuntime`]; accelerator runtimes implement
//! [`ComputeRuntime`] alongside a workload loader for their device.

use crate::Result;

/// Queries and controls the runtime that executes the workload.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait ComputeRuntime {
    /// Whether an accelerator is usable. Authoritative for the whole run.
    fn is_available(&self) -> bool;

    /// Number of accelerators visible to the runtime.
    fn device_count(&self) -> usize;

    /// Marketing name of the accelerator at `ordinal`.
    fn device_name(&self, ordinal: usize) -> Option<String>;

    /// Driver or runtime version string.
    fn runtime_version(&self) -> Option<String>;

    /// Bytes currently held by the runtime's allocator on `ordinal`.
    fn memory_allocated(&self, ordinal: usize) -> Option<u64>;

    /// Total device memory on `ordinal`, as reported by the runtime.
    fn memory_total(&self, ordinal: usize) -> Option<u64>;

    /// Block until all work dispatched to `ordinal` has completed.
    fn synchronize(&self, ordinal: usize) -> Result<()>;
}

/// Runtime for the host CPU. Never reports an accelerator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRuntime;

impl HostRuntime {
    /// Create a host runtime.
    pub fn new() -> Self {
        Self
    }
}

impl ComputeRuntime for HostRuntime {
    fn is_available(&self) -> bool {
        false
    }

    fn device_count(&self) -> usize {
        0
    }

    fn device_name(&self, _ordinal: usize) -> Option<String> {
        None
    }

    fn runtime_version(&self) -> Option<String> {
        None
    }

    fn memory_allocated(&self, _ordinal: usize) -> Option<u64> {
        None
    }

    fn memory_total(&self, _ordinal: usize) -> Option<u64> {
        None
    }

    // Host work is synchronous; there is nothing to wait for.
    fn synchronize(&self, _ordinal: usize) -> Result<()> {
        Ok(())
    }
}
