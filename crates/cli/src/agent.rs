// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! The agent's recovery boundary.
//!
//! Every invocation ends with exactly one submission attempt: the completed
//! result, or an error report when the benchmark fails.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use colored::Colorize;
use fleet_bench_benchmarks::{io, markdown, BenchmarkRunner};
use fleet_bench_core::BenchmarkConfig;
use fleet_bench_reporter::{ResultsReporter, SubmissionPayload};
use tracing::{info, warn};
use uuid::Uuid;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The benchmark ran and the collector accepted the result.
    Submitted,
    /// The benchmark ran but the result was not accepted.
    SubmissionFailed,
    /// The benchmark failed; an error report was attempted.
    BenchmarkFailed,
}

impl AgentOutcome {
    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Submitted)
    }

    /// Process exit status: `0` on success, `1` otherwise.
    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Runs one benchmark and submits what came of it.
#[derive(Debug)]
pub struct Agent {
    runner: BenchmarkRunner,
    config: BenchmarkConfig,
    reporter: ResultsReporter,
    test_type: Option<String>,
    output: Option<PathBuf>,
}

impl Agent {
    /// Create an agent.
    pub fn new(runner: BenchmarkRunner, config: BenchmarkConfig, reporter: ResultsReporter) -> Self {
        Self {
            runner,
            config,
            reporter,
            test_type: None,
            output: None,
        }
    }

    /// Override the reported test type. Defaults to the workload name.
    pub fn with_test_type(mut self, test_type: Option<String>) -> Self {
        self.test_type = test_type;
        self
    }

    /// Archive every payload under `output` before submitting it.
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    /// Run the benchmark and submit its result or its failure.
    pub fn execute(&self) -> AgentOutcome {
        let test_type = self
            .test_type
            .clone()
            .unwrap_or_else(|| self.runner.workload_name().to_string());

        let captured = self.runner.capture();
        let result = self
            .runner
            .run_captured(&self.config, captured.clone())
            .context("Benchmark did not complete");

        match result {
            Ok(result) => {
                let payload = self.reporter.completed_payload(&result, &test_type);
                self.archive(&result.run_id.to_string(), &payload, || {
                    markdown::generate_summary(&result)
                });

                if self.reporter.send(&payload).is_accepted() {
                    println!("{}", "Test completed and submitted successfully".green().bold());
                    AgentOutcome::Submitted
                } else {
                    println!("{}", "Test completed but submission failed".red().bold());
                    AgentOutcome::SubmissionFailed
                }
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error running test:".red().bold(), err);

                let message = format!("{:#}", err);
                let payload = self
                    .reporter
                    .failed_payload(&self.config, &captured, &test_type, &message);
                let run_id = Uuid::new_v4().to_string();
                self.archive(&run_id, &payload, || {
                    markdown::generate_failure_summary(&run_id, Utc::now(), &message)
                });

                if !self.reporter.send(&payload).is_accepted() {
                    warn!("Error report was not delivered");
                }
                AgentOutcome::BenchmarkFailed
            }
        }
    }

    fn archive(&self, run_id: &str, payload: &SubmissionPayload, summary: impl FnOnce() -> String) {
        let Some(dir) = self.output.as_deref() else {
            return;
        };
        match io::write_archive(dir, run_id, payload, &summary()) {
            Ok(paths) => info!(raw = %paths.raw.display(), "Results archived"),
            Err(e) => warn!(error = %e, dir = %dir.display(), "Failed to archive results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use fleet_bench_benchmarks::dataset::Batch;
    use fleet_bench_benchmarks::runner::WARMUP_STEPS;
    use fleet_bench_benchmarks::{
        PooledLinearLoader, Workload, WorkloadError, WorkloadLoader, WorkloadSpec,
    };
    use fleet_bench_collector::{AcceleratorMonitor, TelemetryCollector};
    use fleet_bench_core::{Capabilities, ComputeRuntime, HostRuntime};
    use fleet_bench_reporter::test_support::TestCollector;
    use fleet_bench_reporter::ReporterConfig;
    use tempfile::TempDir;

    struct ExplodingWorkload;

    impl Workload for ExplodingWorkload {
        fn name(&self) -> &str {
            "exploding"
        }

        fn train_step(&mut self, _batch: &Batch) -> Result<f32, WorkloadError> {
            Err(WorkloadError::Other("CUDA error: device-side assert triggered".to_string()))
        }
    }

    struct ExplodingLoader;

    impl WorkloadLoader for ExplodingLoader {
        fn name(&self) -> &str {
            "exploding"
        }

        fn load(&self, _spec: &WorkloadSpec) -> Result<Box<dyn Workload>, WorkloadError> {
            Ok(Box::new(ExplodingWorkload))
        }
    }

    /// Trains normally through warmup, then fails on measured step `fail_on`.
    struct DivergingWorkload {
        steps: usize,
        fail_on: usize,
    }

    impl Workload for DivergingWorkload {
        fn name(&self) -> &str {
            "diverging"
        }

        fn train_step(&mut self, _batch: &Batch) -> Result<f32, WorkloadError> {
            self.steps += 1;
            if self.steps == WARMUP_STEPS + self.fail_on {
                return Err(WorkloadError::NonFiniteLoss(f32::NAN));
            }
            Ok(1.0)
        }
    }

    struct DivergingLoader;

    impl WorkloadLoader for DivergingLoader {
        fn name(&self) -> &str {
            "diverging"
        }

        fn load(&self, _spec: &WorkloadSpec) -> Result<Box<dyn Workload>, WorkloadError> {
            Ok(Box::new(DivergingWorkload {
                steps: 0,
                fail_on: 2,
            }))
        }
    }

    fn runner(loader: Box<dyn WorkloadLoader>) -> BenchmarkRunner {
        let runtime: Arc<dyn ComputeRuntime> = Arc::new(HostRuntime::new());
        BenchmarkRunner::new(
            Arc::clone(&runtime),
            TelemetryCollector::new(&Capabilities::none()),
            AcceleratorMonitor::new(runtime, None),
            loader,
        )
        .with_dataset_size(32)
    }

    fn config() -> BenchmarkConfig {
        BenchmarkConfig::default().with_image_size(4).with_batch_size(8)
    }

    fn agent(loader: Box<dyn WorkloadLoader>, url: &str) -> Agent {
        let reporter =
            ResultsReporter::new(ReporterConfig::new(url, "i-test", "test-key")).unwrap();
        Agent::new(runner(loader), config(), reporter)
    }

    #[test]
    fn test_success_submits_result() {
        let collector = TestCollector::start(200, r#"{"success":true}"#);

        let outcome = agent(Box::new(PooledLinearLoader), &collector.url()).execute();

        assert_eq!(outcome, AgentOutcome::Submitted);
        assert!(outcome.is_success());
        let requests = collector.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body["instance_id"], "i-test");
        assert_eq!(requests[0].body["test_type"], "pooled-linear");
        assert_eq!(requests[0].body["raw_results"]["total_samples"], 32);
        assert!(requests[0].body["error"].is_null());
    }

    #[test]
    fn test_rejected_submission_fails() {
        let collector = TestCollector::start(500, "internal error");

        let outcome = agent(Box::new(PooledLinearLoader), &collector.url()).execute();

        assert_eq!(outcome, AgentOutcome::SubmissionFailed);
        assert!(!outcome.is_success());
        assert_eq!(collector.requests().len(), 1);
    }

    #[test]
    fn test_unreachable_collector_fails() {
        let outcome = agent(Box::new(PooledLinearLoader), &TestCollector::refused_url()).execute();
        assert_eq!(outcome, AgentOutcome::SubmissionFailed);
    }

    #[test]
    fn test_workload_failure_sends_error_report() {
        let collector = TestCollector::start(200, "{}");

        let outcome = agent(Box::new(ExplodingLoader), &collector.url())
            .with_test_type(Some("smoke".to_string()))
            .execute();

        assert_eq!(outcome, AgentOutcome::BenchmarkFailed);
        let requests = collector.requests();
        assert_eq!(requests.len(), 1);
        let body = &requests[0].body;
        assert_eq!(body["test_type"], "smoke");
        let message = body["error_message"].as_str().unwrap();
        assert!(message.contains("Benchmark did not complete"));
        assert!(message.contains("device-side assert"));
        assert_eq!(body["error"], body["error_message"]);
        assert!(body["throughput_samples_per_sec"].is_null());
        assert!(body["loss"].is_null());
        assert!(body["system_telemetry"]["cpu_count"].as_u64().unwrap() >= 1);
        assert!(body["system_telemetry"]["gpu_name"].is_null());
    }

    #[test]
    fn test_measurement_failure_sends_error_report() {
        let collector = TestCollector::start(200, "{}");

        let outcome = agent(Box::new(DivergingLoader), &collector.url()).execute();

        assert_eq!(outcome, AgentOutcome::BenchmarkFailed);
        let requests = collector.requests();
        assert_eq!(requests.len(), 1);
        let body = &requests[0].body;
        let message = body["error_message"].as_str().unwrap();
        assert!(message.contains("epoch 0"));
        assert!(message.contains("Loss diverged"));
        assert!(body["latency_ms"].is_null());
        assert_eq!(body["raw_results"]["error"], body["error_message"]);
    }

    #[test]
    fn test_oversized_image_sends_error_report() {
        let collector = TestCollector::start(200, "{}");
        let reporter =
            ResultsReporter::new(ReporterConfig::new(collector.url(), "i-test", "test-key")).unwrap();
        let config = BenchmarkConfig::default().with_image_size(60_000);

        let outcome = Agent::new(runner(Box::new(PooledLinearLoader)), config, reporter).execute();

        assert_eq!(outcome, AgentOutcome::BenchmarkFailed);
        let requests = collector.requests();
        assert_eq!(requests.len(), 1);
        let body = &requests[0].body;
        assert!(body["error_message"].as_str().unwrap().contains("image_size"));
        assert_eq!(body["image_size"], 60_000);
        assert!(body["throughput_samples_per_sec"].is_null());
    }

    #[test]
    fn test_workload_failure_exits_nonzero_even_if_report_lost() {
        let collector = TestCollector::start(500, "{}");
        let outcome = agent(Box::new(ExplodingLoader), &collector.url()).execute();
        assert_eq!(outcome, AgentOutcome::BenchmarkFailed);

        let outcome = agent(Box::new(ExplodingLoader), &TestCollector::refused_url()).execute();
        assert_eq!(outcome, AgentOutcome::BenchmarkFailed);
    }

    #[test]
    fn test_archive_written_before_submission() {
        let dir = TempDir::new().unwrap();
        let outcome = agent(Box::new(PooledLinearLoader), &TestCollector::refused_url())
            .with_output(Some(dir.path().to_path_buf()))
            .execute();

        assert_eq!(outcome, AgentOutcome::SubmissionFailed);
        let raw: Vec<_> = fs::read_dir(dir.path().join(io::RAW_DIR))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(raw.len(), 1);
        let record: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(raw[0].path()).unwrap()).unwrap();
        assert_eq!(record["instance_id"], "i-test");

        let summary = fs::read_to_string(dir.path().join(io::SUMMARY_FILE)).unwrap();
        assert!(summary.contains("pooled-linear"));
    }

    #[test]
    fn test_failed_run_is_archived() {
        let dir = TempDir::new().unwrap();
        let collector = TestCollector::start(200, "{}");
        agent(Box::new(ExplodingLoader), &collector.url())
            .with_output(Some(dir.path().to_path_buf()))
            .execute();

        let summary = fs::read_to_string(dir.path().join(io::SUMMARY_FILE)).unwrap();
        assert!(summary.contains("device-side assert"));
    }
}
