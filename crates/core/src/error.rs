// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error type shared by the core crate.

use thiserror::Error;

/// Errors raised by core types and compute runtimes.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value or argument is out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The compute device rejected an operation.
    #[error("Device error: {0}")]
    Device(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an [`Error::Device`].
    pub fn device(msg: impl Into<String>) -> Self {
        Error::Device(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
