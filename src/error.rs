//! Error types for the analytics relay.

use std::fmt;
use thiserror::Error;

/// Errors raised by a provider implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider failed: {0}")]
    Failed(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider rejected event '{event}': {reason}")]
    Rejected { event: String, reason: String },
}

/// Manager operation that fans out to providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Track,
    SetUserProperty,
    Identify,
    Reset,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Track => "track",
            Operation::SetUserProperty => "set_user_property",
            Operation::Identify => "identify",
            Operation::Reset => "reset",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider's failure during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Dispatch errors surfaced by the manager.
///
/// Every provider in a snapshot is attempted before this is returned, so a
/// failure here never means later providers were skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(
        "{} failed for {} provider(s): {}",
        .operation,
        .failures.len(),
        join_failures(.failures)
    )]
    ProviderFailures {
        operation: Operation,
        failures: Vec<ProviderFailure>,
        attempted: usize,
    },
}

impl DispatchError {
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            DispatchError::ProviderFailures { failures, .. } => failures,
        }
    }

    pub fn attempted(&self) -> usize {
        match self {
            DispatchError::ProviderFailures { attempted, .. } => *attempted,
        }
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Logging setup failed: {0}")]
    LoggingError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
