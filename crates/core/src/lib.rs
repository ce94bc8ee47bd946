// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for the Fleet Bench agent.
//!
//! This crate holds what every other crate in the workspace agrees on:
//!
//! - [`telemetry`] - host and accelerator telemetry records
//! - [`config`] - benchmark configuration and device selection
//! - [`probe`] - prioritized, fallible telemetry sources
//! - [`capabilities`] - optional-library flags detected at startup
//! - [`runtime`] - the compute runtime seam (presence, identity, barrier)

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capabilities;
pub mod config;
pub mod error;
pub mod probe;
pub mod runtime;
pub mod telemetry;

pub use capabilities::Capabilities;
pub use config::{BenchmarkConfig, Device, ResolvedConfig};
pub use error::{Error, Result};
pub use probe::{Probe, ProbeChain, ProbeError, ProbeResult};
pub use runtime::{ComputeRuntime, HostRuntime};
pub use telemetry::{AcceleratorInfo, AcceleratorMetrics, SystemTelemetry};

#[cfg(any(test, feature = "mock"))]
pub use runtime::MockComputeRuntime;
