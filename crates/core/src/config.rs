// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark configuration and compute device selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Default number of samples per training batch.
pub const DEFAULT_BATCH_SIZE: usize = 32;
/// Default number of passes over the synthetic dataset.
pub const DEFAULT_NUM_EPOCHS: usize = 1;
/// Default square image edge in pixels.
pub const DEFAULT_IMAGE_SIZE: usize = 224;

/// Color channels per synthetic image.
pub const IMAGE_CHANNELS: usize = 3;

/// Largest accepted square image edge in pixels.
pub const MAX_IMAGE_SIZE: usize = 4096;

/// Largest accepted batch tensor, in `f32` elements (2 GiB).
pub const MAX_BATCH_ELEMENTS: usize = 1 << 29;

/// Device a workload runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    /// The first accelerator exposed by the compute runtime.
    #[serde(rename = "cuda")]
    Accelerator,
    /// The host CPU, used when no accelerator is available.
    #[serde(rename = "cpu")]
    Host,
}

impl Device {
    /// Whether work on this device is dispatched asynchronously and needs a
    /// synchronization barrier before timestamps are taken.
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Accelerator)
    }

    /// Name used on the command line and in payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Accelerator => "cuda",
            Device::Host => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cuda" | "cuda:0" | "gpu" | "accelerator" => Ok(Device::Accelerator),
            "cpu" | "host" => Ok(Device::Host),
            other => Err(Error::invalid_input(format!(
                "unknown device '{}', expected 'cuda' or 'cpu'",
                other
            ))),
        }
    }
}

/// Benchmark parameters as requested by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Samples per training batch.
    pub batch_size: usize,
    /// Passes over the synthetic dataset inside the measurement window.
    pub num_epochs: usize,
    /// Square image edge in pixels.
    pub image_size: usize,
    /// Requested device; `None` picks the accelerator when one is available.
    pub device: Option<Device>,
    /// Seed for the synthetic dataset, shuffling and weight initialization.
    pub seed: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            num_epochs: DEFAULT_NUM_EPOCHS,
            image_size: DEFAULT_IMAGE_SIZE,
            device: None,
            seed: 0,
        }
    }
}

impl BenchmarkConfig {
    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the number of epochs.
    pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
        self.num_epochs = num_epochs;
        self
    }

    /// Set the image size.
    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.image_size = image_size;
        self
    }

    /// Request a specific device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject parameters that cannot produce a batch, or whose batch tensor
    /// would not fit in memory.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_input("batch_size must be at least 1"));
        }
        if self.image_size == 0 {
            return Err(Error::invalid_input("image_size must be at least 1"));
        }
        if self.image_size > MAX_IMAGE_SIZE {
            return Err(Error::invalid_input(format!(
                "image_size {} exceeds the maximum of {}",
                self.image_size, MAX_IMAGE_SIZE
            )));
        }
        match self.batch_elements() {
            Some(elements) if elements <= MAX_BATCH_ELEMENTS => Ok(()),
            _ => Err(Error::invalid_input(format!(
                "batch of {} images at {}x{} exceeds {} elements",
                self.batch_size, self.image_size, self.image_size, MAX_BATCH_ELEMENTS
            ))),
        }
    }

    /// Elements in one full batch tensor, `None` on overflow.
    pub fn batch_elements(&self) -> Option<usize> {
        IMAGE_CHANNELS
            .checked_mul(self.image_size)?
            .checked_mul(self.image_size)?
            .checked_mul(self.batch_size)
    }

    /// Freeze the configuration once the device has been resolved.
    pub fn resolve(&self, device: Device) -> ResolvedConfig {
        ResolvedConfig {
            batch_size: self.batch_size,
            num_epochs: self.num_epochs,
            image_size: self.image_size,
            device,
        }
    }
}

/// The configuration a run actually used, recorded in its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Samples per training batch.
    pub batch_size: usize,
    /// Passes over the synthetic dataset.
    pub num_epochs: usize,
    /// Square image edge in pixels.
    pub image_size: usize,
    /// Device the workload ran on.
    pub device: Device,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_agent_cli() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.num_epochs, 1);
        assert_eq!(config.image_size, 224);
        assert!(config.device.is_none());
    }

    #[test]
    fn test_device_parsing() {
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Accelerator);
        assert_eq!("CUDA:0".parse::<Device>().unwrap(), Device::Accelerator);
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Host);
        let err = "tpu".parse::<Device>().unwrap_err();
        assert!(err.to_string().contains("tpu"));
    }

    #[test]
    fn test_device_serializes_as_runtime_name() {
        assert_eq!(serde_json::to_value(Device::Accelerator).unwrap(), "cuda");
        assert_eq!(serde_json::to_value(Device::Host).unwrap(), "cpu");
        assert_eq!(Device::Host.to_string(), "cpu");
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let result = BenchmarkConfig::default().with_batch_size(0).validate();
        assert!(result.unwrap_err().to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_rejects_zero_image_size() {
        let result = BenchmarkConfig::default().with_image_size(0).validate();
        assert!(result.unwrap_err().to_string().contains("image_size"));
    }

    #[test]
    fn test_validate_rejects_oversized_image() {
        let err = BenchmarkConfig::default()
            .with_image_size(60_000)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("60000"));

        let err = BenchmarkConfig::default()
            .with_image_size(usize::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_oversized_batch() {
        let config = BenchmarkConfig::default()
            .with_image_size(MAX_IMAGE_SIZE)
            .with_batch_size(64);
        assert!(config.batch_elements().unwrap() > MAX_BATCH_ELEMENTS);
        assert!(config.validate().unwrap_err().to_string().contains("elements"));

        let overflow = BenchmarkConfig::default()
            .with_image_size(MAX_IMAGE_SIZE)
            .with_batch_size(usize::MAX);
        assert!(overflow.batch_elements().is_none());
        assert!(overflow.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_largest_image() {
        let config = BenchmarkConfig::default()
            .with_image_size(MAX_IMAGE_SIZE)
            .with_batch_size(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_epochs_is_valid() {
        assert!(BenchmarkConfig::default().with_num_epochs(0).validate().is_ok());
    }

    #[test]
    fn test_resolve_records_device() {
        let resolved = BenchmarkConfig::default()
            .with_device(Device::Accelerator)
            .resolve(Device::Host);
        assert_eq!(resolved.device, Device::Host);
        assert_eq!(resolved.batch_size, 32);
    }
}
