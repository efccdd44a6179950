//! Error types used throughout the client

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of [`RtmError`] used for logging and caller policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid local configuration; never retried
    Configuration,
    /// The request did not complete (timeout, connection failure)
    Transport,
    /// The server answered with an HTTP-level failure
    Server,
    /// The server answered and its envelope reported a failure
    Remote,
    /// The caller supplied invalid input
    Client,
}

/// Main error type for the RTM client
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum RtmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Request timed out after {timeout:?}; the server may be overloaded, the network may be \
         failing, requests may be rate limited, or a proxy or firewall may be interfering"
    )]
    Timeout { timeout: Duration },

    #[error("HTTP error: server returned status {status}")]
    Http { status: u16 },

    #[error("Rate limit exceeded: server returned 503 on all {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Timeline creation failed after {attempts} attempt(s): {reason}")]
    TimelineCreation { attempts: u32, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl RtmError {
    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::Io(_) => ErrorCategory::Configuration,
            Self::Timeout { .. } | Self::Network(_) => ErrorCategory::Transport,
            Self::Http { .. } | Self::RateLimited { .. } | Self::InvalidResponse(_) => {
                ErrorCategory::Server
            }
            Self::Api { .. } | Self::TimelineCreation { .. } => ErrorCategory::Remote,
            Self::InvalidInput(_) => ErrorCategory::Client,
        }
    }

    /// Stable label suitable for structured log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Timeout { .. } => "timeout",
            Self::Http { .. } => "http",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api",
            Self::TimelineCreation { .. } => "timeline_creation",
            Self::Network(_) => "network",
            Self::InvalidResponse(_) => "invalid_response",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io",
        }
    }

    /// Whether the request may not have reached the server at all.
    pub fn is_transient(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transport)
    }

    /// Remote error code, when the envelope reported one.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RtmError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<std::io::Error> for RtmError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for RTM operations
pub type Result<T> = std::result::Result<T, RtmError>;
