//! Turning records into index documents.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::errors::SearchSyncError;
use crate::record::Record;

type ProjectFn<R> = dyn Fn(&R) -> Result<Value, SearchSyncError> + Send + Sync;

/// Produces the JSON document stored for a record.
///
/// Every projection must be a JSON object; anything else is rejected with a
/// projection error naming the record.
pub struct DocumentProjector<R> {
    project: Arc<ProjectFn<R>>,
}

impl<R: Record> DocumentProjector<R> {
    pub fn new<F>(project: F) -> Self
    where
        F: Fn(&R) -> Result<Value, SearchSyncError> + Send + Sync + 'static,
    {
        Self {
            project: Arc::new(project),
        }
    }

    /// Project with the record's `Serialize` implementation.
    pub fn serialized() -> Self
    where
        R: Serialize,
    {
        Self::new(|record: &R| {
            serde_json::to_value(record)
                .map_err(|e| SearchSyncError::projection(record.record_id(), e.to_string()))
        })
    }

    pub fn project(&self, record: &R) -> Result<Value, SearchSyncError> {
        let document = (self.project)(record)?;
        if !document.is_object() {
            return Err(SearchSyncError::projection(
                record.record_id(),
                format!("document must be a JSON object, got {}", document),
            ));
        }
        Ok(document)
    }
}

impl<R> Clone for DocumentProjector<R> {
    fn clone(&self) -> Self {
        Self {
            project: Arc::clone(&self.project),
        }
    }
}

impl<R> fmt::Debug for DocumentProjector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentProjector").finish_non_exhaustive()
    }
}
