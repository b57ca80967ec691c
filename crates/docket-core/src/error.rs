//! Error types for the docket-core library.

use thiserror::Error;

/// Main error type for the docket library.
///
/// Extraction problems and rule failures never show up here: they are
/// downgraded to data (null fields, failed rule results). Only failures that
/// make the current operation impossible propagate.
#[derive(Error, Debug)]
pub enum DocketError {
    /// An external store (documents, shipments, audit log) could not be reached.
    #[error("{resource} unavailable: {message}")]
    RepositoryUnavailable { resource: String, message: String },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Two rules were registered under the same id.
    #[error("duplicate rule id: {0}")]
    DuplicateRule(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocketError {
    /// Shorthand for a repository outage.
    pub fn unavailable(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable { .. })
    }
}

/// A single rule failed to evaluate.
///
/// The engine turns this into a failed INFO-severity result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleFault {
    /// A value needed by the rule could not be interpreted.
    #[error("cannot interpret {field}: {reason}")]
    Uninterpretable { field: String, reason: String },

    /// Anything else that went wrong inside the rule.
    #[error("{0}")]
    Internal(String),
}

/// Errors returned by an AI fallback strategy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FallbackError {
    /// The provider could not be reached or refused the request.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider answered with something that is not a field value.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Result type for the docket library.
pub type Result<T> = std::result::Result<T, DocketError>;
