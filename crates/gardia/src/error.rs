//! Error types for gardia.
//!
//! This module defines the error type shared by intake, transmission,
//! configuration and the web layer.

use std::path::PathBuf;

use gardia_mesh::MeshError;
use thiserror::Error;

/// The main error type for gardia operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Intake Errors ===
    /// A required form field was empty after trimming.
    #[error("missing required field: {field}")]
    MissingField {
        /// Form name of the field.
        field: &'static str,
    },

    // === Transmission Errors ===
    /// The payload is longer than the configured radio budget.
    #[error("message too long: {len} bytes (limit {limit})")]
    MessageTooLong {
        /// Payload size in bytes.
        len: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The radio driver failed.
    #[error("mesh link error: {0}")]
    Mesh(#[from] MeshError),

    /// Transmission failed for a reason outside the driver.
    #[error("transmission failed: {0}")]
    Transmit(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write a configuration file.
    #[error("failed to write configuration to {path}: {source}")]
    ConfigWrite {
        /// Path of the file being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// YAML serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for gardia operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new transmission error.
    #[must_use]
    pub fn transmit(message: impl Into<String>) -> Self {
        Self::Transmit(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error was caused by the submitted data rather than the
    /// service.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }

    /// Check if this error came from the radio link.
    #[must_use]
    pub fn is_link_error(&self) -> bool {
        matches!(self, Self::Mesh(_) | Self::Transmit(_))
    }
}
