// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Optional-library capability flags, detected once at startup.

use serde::{Deserialize, Serialize};

/// Which optional telemetry facilities this instance offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// A vendor metrics handle (NVML) could be opened.
    pub has_vendor_metrics: bool,
    /// The general host-introspection facility supports this OS.
    pub has_host_introspection: bool,
}

impl Capabilities {
    /// No optional facility available.
    pub fn none() -> Self {
        Self::default()
    }
}
