// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown reports for benchmark runs.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::result::BenchmarkResult;

/// Generate a markdown summary of a completed run.
pub fn generate_summary(result: &BenchmarkResult) -> String {
    Summary(result).to_string()
}

/// Generate a markdown summary of a run that failed before producing a
/// result.
pub fn generate_failure_summary(run_id: &str, at: DateTime<Utc>, error_message: &str) -> String {
    Failure {
        run_id,
        at,
        error_message,
    }
    .to_string()
}

struct Summary<'a>(&'a BenchmarkResult);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(f, "# Benchmark Summary")?;
        writeln!(f)?;
        writeln!(f, "Run: `{}`", r.run_id)?;
        writeln!(f, "Workload: {}", r.workload)?;
        writeln!(
            f,
            "Started: {}",
            r.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f)?;

        writeln!(f, "## Results")?;
        writeln!(f)?;
        writeln!(f, "| Metric | Value |")?;
        writeln!(f, "|--------|-------|")?;
        writeln!(f, "| Device | {} |", r.config.device)?;
        writeln!(f, "| Batch size | {} |", r.config.batch_size)?;
        writeln!(f, "| Epochs | {} |", r.config.num_epochs)?;
        writeln!(f, "| Image size | {} |", r.config.image_size)?;
        writeln!(
            f,
            "| Throughput (samples/s) | {:.2} |",
            r.throughput_samples_per_sec
        )?;
        writeln!(f, "| Latency (ms/batch) | {:.2} |", r.latency_ms_per_batch)?;
        writeln!(f, "| Average loss | {:.4} |", r.avg_loss)?;
        writeln!(f, "| Duration (s) | {:.3} |", r.duration_seconds)?;
        writeln!(f, "| Samples | {} |", r.total_samples)?;
        writeln!(f, "| Batches | {} |", r.batch_count)?;
        writeln!(f)?;

        writeln!(f, "## Host")?;
        writeln!(f)?;
        let host = &r.system_telemetry;
        writeln!(f, "- CPUs: {}", or_unknown(host.logical_cpu_count))?;
        writeln!(f, "- RAM: {}", or_unknown(host.ram_gb().map(gib)))?;
        writeln!(f, "- Disk: {}", or_unknown(host.disk_space_gb().map(gib)))?;
        writeln!(f)?;

        writeln!(f, "## Accelerator")?;
        writeln!(f)?;
        let info = &r.accelerator_info;
        if !info.present {
            writeln!(f, "No accelerator detected.")?;
        } else {
            let metrics = &r.accelerator_metrics;
            writeln!(f, "- Name: {}", or_unknown(info.name.as_deref()))?;
            writeln!(f, "- Count: {}", or_unknown(info.count))?;
            writeln!(f, "- Driver: {}", or_unknown(info.driver_version.as_deref()))?;
            writeln!(
                f,
                "- Utilization: {}",
                or_unknown(metrics.utilization_percent.map(|p| format!("{}%", p)))
            )?;
            writeln!(
                f,
                "- Power: {}",
                or_unknown(metrics.power_draw_watts.map(|w| format!("{:.1} W", w)))
            )?;
            writeln!(
                f,
                "- Temperature: {}",
                or_unknown(metrics.temperature_celsius.map(|c| format!("{} C", c)))
            )?;
        }

        if r.epoch_durations_seconds.len() > 1 {
            writeln!(f)?;
            writeln!(f, "## Epochs")?;
            writeln!(f)?;
            writeln!(f, "| Epoch | Seconds |")?;
            writeln!(f, "|-------|---------|")?;
            for (epoch, seconds) in r.epoch_durations_seconds.iter().enumerate() {
                writeln!(f, "| {} | {:.3} |", epoch, seconds)?;
            }
        }
        Ok(())
    }
}

struct Failure<'a> {
    run_id: &'a str,
    at: DateTime<Utc>,
    error_message: &'a str,
}

impl fmt::Display for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Benchmark Summary")?;
        writeln!(f)?;
        writeln!(f, "Run: `{}`", self.run_id)?;
        writeln!(f, "Failed: {}", self.at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f)?;
        writeln!(f, "## Error")?;
        writeln!(f)?;
        writeln!(f, "```")?;
        writeln!(f, "{}", self.error_message)?;
        writeln!(f, "```")
    }
}

fn gib(value: f64) -> String {
    format!("{:.1} GiB", value)
}

fn or_unknown(value: Option<impl fmt::Display>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
