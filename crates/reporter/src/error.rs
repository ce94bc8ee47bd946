// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reporter error types.

use thiserror::Error;

/// Errors raised while setting up submission.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The collector endpoint cannot be used.
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// Result type for reporter operations.
pub type Result<T> = std::result::Result<T, ReportError>;
