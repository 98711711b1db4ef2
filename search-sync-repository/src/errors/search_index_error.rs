//! Search index error types.
//!
//! Any engine response carrying an `error` field, or a non-2xx status, becomes
//! a single `EngineError` holding the status and message. Callers that
//! tolerate specific cases ("index already exists", "not found") classify it
//! with [`SearchIndexError::is_already_exists`] and
//! [`SearchIndexError::is_not_found`].

use serde_json::Value;
use thiserror::Error;

/// Unified errors from search engine operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g. empty id, malformed request).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the engine (connection refused, timeout, bad URL).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The engine answered with an error.
    #[error("Engine error ({status}): {message}")]
    EngineError { status: u16, message: String },

    /// A bulk request was rejected as a whole.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to parse a response from the engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an engine error.
    pub fn engine(status: u16, msg: impl Into<String>) -> Self {
        Self::EngineError {
            status,
            message: msg.into(),
        }
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Build an engine error from a response status and body.
    ///
    /// The `error` field may be a plain string or an object with `type` and
    /// `reason`; both are folded into the message.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = match body.get("error") {
            Some(Value::String(msg)) => msg.clone(),
            Some(Value::Object(error)) => {
                let kind = error.get("type").and_then(Value::as_str);
                let reason = error.get("reason").and_then(Value::as_str);
                match (kind, reason) {
                    (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
                    (Some(kind), None) => kind.to_string(),
                    (None, Some(reason)) => reason.to_string(),
                    (None, None) => Value::Object(error.clone()).to_string(),
                }
            }
            Some(other) => other.to_string(),
            None => match body {
                Value::Null => format!("request failed with status {}", status),
                other => other.to_string(),
            },
        };
        Self::engine(status, message)
    }

    /// True when the engine reported a missing index or document.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::EngineError { status, message } => {
                *status == 404
                    || message.contains("not_found")
                    || message.contains("IndexMissing")
            }
            _ => false,
        }
    }

    /// True when the engine reported that an index already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::EngineError { message, .. } => {
                message.contains("already_exists") || message.contains("IndexAlreadyExists")
            }
            _ => false,
        }
    }
}
