//! Error types for the search synchronization layer.

use search_sync_repository::SearchIndexError;
use search_sync_shared::PaginationError;
use thiserror::Error;

/// Errors raised by synchronization, search and administration.
#[derive(Error, Debug)]
pub enum SearchSyncError {
    /// Error reported by the search engine.
    #[error("Search engine error: {0}")]
    EngineError(#[from] SearchIndexError),

    /// Error from the authoritative record store.
    #[error("Record store error: {0}")]
    StoreError(String),

    /// A record could not be turned into an index document.
    #[error("Projection error for record {id}: {message}")]
    ProjectionError { id: String, message: String },

    /// Invalid configuration: bad predicate reference, missing option.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A task could not be enqueued.
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Invalid page or per-page value.
    #[error("Pagination error: {0}")]
    PaginationError(#[from] PaginationError),
}

impl SearchSyncError {
    /// Create a record store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    /// Create a projection error for the record `id`.
    pub fn projection(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProjectionError {
            id: id.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a queue error.
    pub fn queue(msg: impl Into<String>) -> Self {
        Self::QueueError(msg.into())
    }

    /// True when the engine reported a missing index or document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EngineError(e) if e.is_not_found())
    }
}
