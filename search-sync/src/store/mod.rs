//! Authoritative record store boundary.

use async_trait::async_trait;

use crate::errors::SearchSyncError;
use crate::record::{Record, RecordId};

/// Subset of records walked by a reindex.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every record of the kind.
    #[default]
    All,
    /// A subset the store knows by name.
    Named(String),
}

impl Scope {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

/// Read access to the records behind an index.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Load the records with the given ids.
    ///
    /// Missing ids are left out and the result order is unspecified.
    async fn find_by_ids(&self, ids: &[RecordId]) -> Result<Vec<R>, SearchSyncError>;

    /// Load one batch of `scope`, in a stable order.
    async fn find_batch(
        &self,
        scope: &Scope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<R>, SearchSyncError>;

    /// Load a single record.
    async fn find(&self, id: &str) -> Result<Option<R>, SearchSyncError> {
        let mut found = self.find_by_ids(&[id.to_string()]).await?;
        Ok(found.pop())
    }
}
