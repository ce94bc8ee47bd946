// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP submission to the remote collector.
//!
//! One POST per call, no retries, no redirects. Only HTTP 200 counts as
//! accepted; rejections and transport failures are reported separately.

use std::time::Duration;

use fleet_bench_benchmarks::{BenchmarkResult, CapturedTelemetry};
use fleet_bench_core::BenchmarkConfig;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use tracing::{error, info, warn};

use crate::error::{ReportError, Result};
use crate::payload::SubmissionPayload;

/// Header carrying the collector API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and as whom results are submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Collector endpoint receiving the POST.
    pub endpoint_url: String,
    /// Instance under test.
    pub instance_id: String,
    /// Collector API key.
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ReporterConfig {
    /// Create a config with the default timeout.
    pub fn new(
        endpoint_url: impl Into<String>,
        instance_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            instance_id: instance_id.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("instance_id", &self.instance_id)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// HTTP 200.
    Accepted {
        /// Response body.
        body: String,
    },
    /// Any other HTTP status, including redirects.
    Rejected {
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: String,
    },
    /// No HTTP response: refused connection, timeout, DNS failure.
    Unreachable {
        /// Transport error text.
        reason: String,
    },
}

impl SubmitOutcome {
    /// Whether the collector accepted the payload.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

/// Submits payloads to the collector.
#[derive(Debug)]
pub struct ResultsReporter {
    client: Client,
    endpoint: Url,
    config: ReporterConfig,
}

impl ResultsReporter {
    /// Build a reporter.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint is not an absolute http(s) URL or the HTTP
    /// client cannot be constructed.
    pub fn new(config: ReporterConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint_url).map_err(|e| ReportError::InvalidEndpoint {
            url: config.endpoint_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ReportError::InvalidEndpoint {
                url: config.endpoint_url.clone(),
                reason: format!("unsupported scheme '{}'", endpoint.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(ReportError::Client)?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// The reporter's configuration.
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Payload for a completed run under this reporter's identity.
    pub fn completed_payload(&self, result: &BenchmarkResult, test_type: &str) -> SubmissionPayload {
        SubmissionPayload::completed(
            &self.config.instance_id,
            &self.config.api_key,
            test_type,
            result,
        )
    }

    /// Payload for a failed run under this reporter's identity.
    pub fn failed_payload(
        &self,
        config: &BenchmarkConfig,
        captured: &CapturedTelemetry,
        test_type: &str,
        error_message: &str,
    ) -> SubmissionPayload {
        SubmissionPayload::failed(
            &self.config.instance_id,
            &self.config.api_key,
            test_type,
            config,
            captured,
            error_message,
        )
    }

    /// Submit a completed run. Returns whether the collector accepted it.
    pub fn submit(&self, result: &BenchmarkResult, test_type: &str) -> bool {
        self.send(&self.completed_payload(result, test_type))
            .is_accepted()
    }

    /// POST one payload and classify the response. Never panics or fails.
    pub fn send(&self, payload: &SubmissionPayload) -> SubmitOutcome {
        info!(
            endpoint = %self.endpoint,
            instance_id = %payload.instance_id,
            error_report = payload.is_error(),
            "Submitting results"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(payload)
            .send();

        let outcome = match response {
            Ok(response) => {
                let status = response.status();
                let body = response.text().unwrap_or_default();
                if status == StatusCode::OK {
                    SubmitOutcome::Accepted { body }
                } else {
                    SubmitOutcome::Rejected { status, body }
                }
            }
            Err(e) => SubmitOutcome::Unreachable {
                reason: e.to_string(),
            },
        };

        match &outcome {
            SubmitOutcome::Accepted { body } => {
                info!(response = %body, "Results submitted successfully");
            }
            SubmitOutcome::Rejected { status, body } => {
                error!(status = status.as_u16(), response = %body, "Collector rejected submission");
            }
            SubmitOutcome::Unreachable { reason } => {
                warn!(error = %reason, "Collector unreachable, submission not delivered");
            }
        }

        outcome
    }
}

/// Submit a completed run to `endpoint`. Returns whether it was accepted.
///
/// Every failure, including an unusable endpoint, is logged and reported
/// as `false`.
pub fn submit(
    endpoint: &str,
    instance_id: &str,
    api_key: &str,
    result: &BenchmarkResult,
    test_type: &str,
) -> bool {
    match ResultsReporter::new(ReporterConfig::new(endpoint, instance_id, api_key)) {
        Ok(reporter) => reporter.submit(result, test_type),
        Err(e) => {
            error!(error = %e, "Cannot submit results");
            false
        }
    }
}
