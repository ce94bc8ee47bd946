// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Training workloads.
//!
//! A [`Workload`] owns a model, its optimizer and loss function on one
//! device, and performs one full forward/backward/update step per batch.
//! A [`WorkloadLoader`] builds a workload for a resolved device.

mod pooled_linear;

pub use pooled_linear::{PooledLinear, PooledLinearLoader};

use fleet_bench_core::Device;
use thiserror::Error;

use crate::dataset::Batch;

/// Errors raised while loading or stepping a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// The workload cannot run on the requested device.
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(Device),

    /// A batch does not match the shape the model was built for.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape {
        /// What the model expects.
        expected: String,
        /// What the batch contained.
        actual: String,
    },

    /// The training step produced a non-finite loss.
    #[error("Loss diverged to {0}")]
    NonFiniteLoss(f32),

    /// Any other workload-specific failure.
    #[error("{0}")]
    Other(String),
}

/// What a loader needs to build a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSpec {
    /// Side length of input images.
    pub image_size: usize,
    /// Number of output classes.
    pub num_classes: usize,
    /// Device the workload must run on.
    pub device: Device,
    /// Seed for parameter initialization.
    pub seed: u64,
}

/// A model plus optimizer plus loss, resident on one device.
pub trait Workload {
    /// Stable name reported with results.
    fn name(&self) -> &str;

    /// Run one forward/backward/optimizer step and return the batch loss.
    fn train_step(&mut self, batch: &Batch) -> Result<f32, WorkloadError>;
}

/// Builds workloads on a target device.
pub trait WorkloadLoader {
    /// Name of the workloads this loader builds.
    fn name(&self) -> &str;

    /// Whether this loader can build a workload for `device`.
    fn supports(&self, device: Device) -> bool {
        let _ = device;
        true
    }

    /// Instantiate the workload and place it on `spec.device`.
    fn load(&self, spec: &WorkloadSpec) -> Result<Box<dyn Workload>, WorkloadError>;
}
