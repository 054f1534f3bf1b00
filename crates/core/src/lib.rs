//! Shared primitives for all pullbridge crates.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type used across pullbridge crates.
pub type AppResult<T> = Result<T, AppError>;

/// Identifier of one connected third-party data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationId(Uuid);

impl IntegrationId {
    /// Creates a random integration identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an integration identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses an integration identifier from its hyphenated UUID form.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
            AppError::Validation(format!("invalid integration id '{value}': {error}"))
        })
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for IntegrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for IntegrationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Network-level failure: connection, DNS, TLS, timeout or an unreadable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote endpoint answered with a non-2xx status.
    #[error("http status error: {status} returned by {url}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Missing or unsupported configuration. Never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Expected field is absent from a remote response.
    #[error("field extraction error: {0}")]
    FieldExtraction(String),

    /// Filter expression could not be parsed or evaluated.
    #[error("transform error: {0}")]
    Transform(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the error happened at the transport layer.
    ///
    /// Non-2xx statuses count as transport errors; they are what retry policies react to.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }
}
