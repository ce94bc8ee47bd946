// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host telemetry collection.
//!
//! Each field has its own [`ProbeChain`]. The default chains are:
//!
//! | field | sources, highest priority first |
//! |---|---|
//! | RAM capacity | `sysinfo`, `/proc/meminfo` (Linux) |
//! | logical CPUs | `sysinfo`, `available_parallelism`, `/sys/devices/system/cpu/online`, constant `1` |
//! | disk capacity | filesystem usage of `/` |
//!
//! `sysinfo` sources are only included when host introspection is supported.

use std::fs;
use std::num::NonZeroUsize;

use fleet_bench_core::probe::{Probe, ProbeChain, ProbeError, ProbeResult};
use fleet_bench_core::{Capabilities, SystemTelemetry};
use sysinfo::System;
use tracing::{debug, info, warn};

/// Memory-info pseudo-file on Linux.
pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Kernel list of online CPUs, e.g. `0-3,6`.
pub const CPU_ONLINE_PATH: &str = "/sys/devices/system/cpu/online";

/// Path whose filesystem capacity is reported.
pub const ROOT_PATH: &str = "/";

/// Gathers static host facts, degrading field by field.
#[derive(Debug)]
pub struct TelemetryCollector {
    ram: ProbeChain<u64>,
    cpus: ProbeChain<usize>,
    disk: ProbeChain<u64>,
}

impl TelemetryCollector {
    /// Build the default probe chains for the detected capabilities.
    pub fn new(capabilities: &Capabilities) -> Self {
        let mut ram = ProbeChain::new("ram_capacity_bytes");
        let mut cpus = ProbeChain::new("logical_cpu_count");

        if capabilities.has_host_introspection {
            ram = ram.with(Probe::new("sysinfo", sysinfo_total_memory));
            cpus = cpus.with(Probe::new("sysinfo", sysinfo_logical_cpus));
        }
        if cfg!(target_os = "linux") {
            ram = ram.with(Probe::new("meminfo", read_meminfo_total));
        }

        let cpus = cpus
            .with(Probe::new("available_parallelism", os_parallelism))
            .with(Probe::new("cpu_online_list", read_online_cpu_list))
            .with(Probe::new("default", || Ok(1)));

        let disk = ProbeChain::new("disk_capacity_bytes")
            .with(Probe::new("root_filesystem", root_filesystem_capacity));

        debug!(
            ram = ?ram.sources(),
            cpus = ?cpus.sources(),
            disk = ?disk.sources(),
            "Host telemetry sources"
        );
        Self::from_chains(ram, cpus, disk)
    }

    /// Build a collector from explicit chains.
    pub fn from_chains(
        ram: ProbeChain<u64>,
        cpus: ProbeChain<usize>,
        disk: ProbeChain<u64>,
    ) -> Self {
        Self { ram, cpus, disk }
    }

    /// Resolve every field. Never fails; unknown fields stay `None`.
    pub fn collect(&self) -> SystemTelemetry {
        let telemetry = SystemTelemetry {
            ram_capacity_bytes: self.ram.resolve(),
            logical_cpu_count: self.cpus.resolve(),
            disk_capacity_bytes: self.disk.resolve(),
        };

        if telemetry.is_empty() {
            warn!("No host telemetry source succeeded");
            return telemetry;
        }

        info!(
            cpus = ?telemetry.logical_cpu_count,
            ram_gb = ?telemetry.ram_gb().map(|gb| (gb * 10.0).round() / 10.0),
            disk_gb = ?telemetry.disk_space_gb().map(|gb| gb.round()),
            "System telemetry collected"
        );

        telemetry
    }
}

fn sysinfo_total_memory() -> ProbeResult<u64> {
    let mut system = System::new();
    system.refresh_memory();
    match system.total_memory() {
        0 => Err(ProbeError::failed("sysinfo reported zero total memory")),
        bytes => Ok(bytes),
    }
}

fn sysinfo_logical_cpus() -> ProbeResult<usize> {
    let mut system = System::new();
    system.refresh_cpu_all();
    match system.cpus().len() {
        0 => Err(ProbeError::failed("sysinfo reported no CPUs")),
        count => Ok(count),
    }
}

fn read_meminfo_total() -> ProbeResult<u64> {
    let text = fs::read_to_string(MEMINFO_PATH)
        .map_err(|e| ProbeError::unavailable(format!("{}: {}", MEMINFO_PATH, e)))?;
    parse_meminfo_total(&text)
}

/// Extract `MemTotal` from `/proc/meminfo` content, in bytes.
pub fn parse_meminfo_total(text: &str) -> ProbeResult<u64> {
    let line = text
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .ok_or_else(|| ProbeError::failed("MemTotal line missing"))?;

    let mut fields = line.split_whitespace().skip(1);
    let value: u64 = fields
        .next()
        .ok_or_else(|| ProbeError::failed("MemTotal has no value"))?
        .parse()
        .map_err(|e| ProbeError::failed(format!("MemTotal value: {}", e)))?;

    let multiplier = match fields.next() {
        Some(unit) if unit.eq_ignore_ascii_case("kb") => 1024,
        None => 1,
        Some(unit) => {
            return Err(ProbeError::failed(format!("unexpected MemTotal unit '{}'", unit)))
        }
    };

    match value.checked_mul(multiplier) {
        Some(0) | None => Err(ProbeError::failed("MemTotal out of range")),
        Some(bytes) => Ok(bytes),
    }
}

fn os_parallelism() -> ProbeResult<usize> {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .map_err(|e| ProbeError::unavailable(e.to_string()))
}

fn read_online_cpu_list() -> ProbeResult<usize> {
    let text = fs::read_to_string(CPU_ONLINE_PATH)
        .map_err(|e| ProbeError::unavailable(format!("{}: {}", CPU_ONLINE_PATH, e)))?;
    parse_cpu_list(&text)
}

/// Count the CPUs in a kernel CPU list such as `0-3,6,8-9`.
pub fn parse_cpu_list(text: &str) -> ProbeResult<usize> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ProbeError::failed("empty CPU list"));
    }

    let mut count = 0usize;
    for part in text.split(',') {
        let part = part.trim();
        let parse = |s: &str| {
            s.trim()
                .parse::<usize>()
                .map_err(|e| ProbeError::failed(format!("CPU list entry '{}': {}", part, e)))
        };
        count += match part.split_once('-') {
            Some((first, last)) => {
                let (first, last) = (parse(first)?, parse(last)?);
                if last < first {
                    return Err(ProbeError::failed(format!("descending CPU range '{}'", part)));
                }
                last - first + 1
            }
            None => {
                parse(part)?;
                1
            }
        };
    }
    Ok(count)
}

fn root_filesystem_capacity() -> ProbeResult<u64> {
    match fs2::total_space(ROOT_PATH) {
        Ok(0) => Err(ProbeError::failed("root filesystem reports zero capacity")),
        Ok(bytes) => Ok(bytes),
        Err(e) => Err(ProbeError::unavailable(format!("{}: {}", ROOT_PATH, e))),
    }
}
