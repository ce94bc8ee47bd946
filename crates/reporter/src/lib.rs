// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Result submission for Fleet Bench.
//!
//! [`SubmissionPayload`] is the wire document; [`ResultsReporter`] posts it
//! and classifies the response as a [`SubmitOutcome`].

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod payload;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{submit, ReporterConfig, ResultsReporter, SubmitOutcome, API_KEY_HEADER};
pub use error::{ReportError, Result};
pub use payload::{RawResults, SubmissionPayload, TelemetryPayload};
