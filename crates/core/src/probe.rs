// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Prioritized telemetry probes.
//!
//! A [`Probe`] is one fallible data source for one field. A [`ProbeChain`]
//! evaluates its probes in order and keeps the first success. Failures are
//! routine on stripped or heterogeneous instances: they are logged at `debug`
//! and never surface to the caller.
//!
//! # Example
//!
//! ```
//! use fleet_bench_core::probe::{Probe, ProbeChain, ProbeError};
//!
//! let chain = ProbeChain::new("logical_cpu_count")
//!     .with(Probe::new("unavailable", || Err(ProbeError::unavailable("no library"))))
//!     .with(Probe::new("default", || Ok(1usize)));
//!
//! assert_eq!(chain.resolve(), Some(1));
//! ```

use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Why a probe could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The source does not exist on this instance.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source exists but the read failed or returned garbage.
    #[error("read failed: {0}")]
    Failed(String),
}

impl ProbeError {
    /// Create a [`ProbeError::Unavailable`].
    pub fn unavailable(msg: impl Into<String>) -> Self {
        ProbeError::Unavailable(msg.into())
    }

    /// Create a [`ProbeError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        ProbeError::Failed(msg.into())
    }
}

/// Result of a single probe read.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

type ReadFn<T> = Box<dyn Fn() -> ProbeResult<T> + Send + Sync>;

/// A named, fallible data source.
pub struct Probe<T> {
    source: &'static str,
    read: ReadFn<T>,
}

impl<T> Probe<T> {
    /// Create a probe from a source name and a read function.
    pub fn new<F>(source: &'static str, read: F) -> Self
    where
        F: Fn() -> ProbeResult<T> + Send + Sync + 'static,
    {
        Self {
            source,
            read: Box::new(read),
        }
    }

    /// Name of the data source.
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Read the value once.
    pub fn read(&self) -> ProbeResult<T> {
        (self.read)()
    }
}

impl<T> fmt::Debug for Probe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("source", &self.source).finish()
    }
}

/// Ordered probes for one telemetry field.
#[derive(Debug)]
pub struct ProbeChain<T> {
    field: &'static str,
    probes: Vec<Probe<T>>,
}

impl<T> ProbeChain<T> {
    /// Create an empty chain. An empty chain always resolves to `None`.
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            probes: Vec::new(),
        }
    }

    /// Append a lower-priority probe.
    pub fn with(mut self, probe: Probe<T>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Source names in priority order.
    pub fn sources(&self) -> Vec<&'static str> {
        self.probes.iter().map(Probe::source).collect()
    }

    /// Evaluate probes in order and return the first value read.
    pub fn resolve(&self) -> Option<T> {
        for probe in &self.probes {
            match probe.read() {
                Ok(value) => {
                    debug!(field = self.field, source = probe.source(), "Telemetry field resolved");
                    return Some(value);
                }
                Err(error) => {
                    debug!(
                        field = self.field,
                        source = probe.source(),
                        %error,
                        "Telemetry source failed, trying next"
                    );
                }
            }
        }
        debug!(field = self.field, "No telemetry source could determine field");
        None
    }
}

/// Keep a single guarded read, logging and discarding its failure.
pub fn best_effort<T>(field: &'static str, result: ProbeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(field, %error, "Metric unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn failing(source: &'static str) -> Probe<u64> {
        Probe::new(source, move || Err(ProbeError::failed(source)))
    }

    #[test]
    fn test_first_success_wins() {
        let chain = ProbeChain::new("ram")
            .with(Probe::new("primary", || Ok(8u64)))
            .with(Probe::new("secondary", || Ok(4u64)));
        assert_eq!(chain.resolve(), Some(8));
    }

    #[test]
    fn test_falls_through_failures_in_order() {
        let chain = ProbeChain::new("ram")
            .with(failing("primary"))
            .with(failing("secondary"))
            .with(Probe::new("tertiary", || Ok(2u64)));
        assert_eq!(chain.resolve(), Some(2));
    }

    #[test]
    fn test_later_probes_not_read_after_success() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let chain = ProbeChain::new("ram")
            .with(Probe::new("primary", || Ok(1u64)))
            .with(Probe::new("secondary", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(2u64)
            }));

        assert_eq!(chain.resolve(), Some(1));
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exhausted_chain_is_none() {
        let chain = ProbeChain::new("disk")
            .with(failing("primary"))
            .with(failing("secondary"));
        assert_eq!(chain.resolve(), None);
    }

    #[test]
    fn test_empty_chain_is_none() {
        let chain: ProbeChain<u64> = ProbeChain::new("disk");
        assert!(chain.sources().is_empty());
        assert_eq!(chain.resolve(), None);
    }

    #[test]
    fn test_sources_in_priority_order() {
        let chain = ProbeChain::new("ram")
            .with(failing("sysinfo"))
            .with(failing("meminfo"));
        assert_eq!(chain.sources(), vec!["sysinfo", "meminfo"]);
    }

    #[test]
    fn test_best_effort() {
        assert_eq!(best_effort("power", Ok(250)), Some(250));
        assert_eq!(
            best_effort::<u32>("power", Err(ProbeError::unavailable("not supported"))),
            None
        );
    }
}
