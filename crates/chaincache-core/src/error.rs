//! Error types for node access and configuration.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to a node or a price source.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, DNS, reset, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` for connectivity failures, the ones the failure policy
    /// counts towards node rotation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the node answered but the payload had an unexpected shape.
    pub fn is_malformed(&self) -> bool {
        !self.is_retryable()
    }
}

/// Errors raised while validating configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("node list is empty")]
    NoNodes,

    #[error(
        "{what} poll interval {min:?}..{max:?} is out of range; it must lie between {lowest:?} and {highest:?}"
    )]
    PollIntervalOutOfRange {
        what: &'static str,
        min: Duration,
        max: Duration,
        lowest: Duration,
        highest: Duration,
    },

    #[error("{what} poll interval minimum {min:?} exceeds maximum {max:?}")]
    InvertedPollInterval {
        what: &'static str,
        min: Duration,
        max: Duration,
    },

    #[error("error threshold must be at least 1")]
    ZeroErrorThreshold,

    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("route path {path:?} {reason}")]
    InvalidRoutePath { path: String, reason: &'static str },

    #[error("cannot build client for {url}: {reason}")]
    Client { url: String, reason: String },
}

/// A string that does not match the node address format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0:?}")]
pub struct InvalidAddress(pub String);
