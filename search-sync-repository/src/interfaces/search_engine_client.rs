//! Search engine client trait definition.
//!
//! The trait mirrors the engine's REST conventions: documents live under an
//! `(index, type)` pair and are addressed by id, indices are created and
//! dropped as a whole, and aliases point a logical name at a concrete index.

use async_trait::async_trait;
use serde_json::Value;

use search_sync_shared::{SearchRequest, SearchResponse};

use crate::errors::SearchIndexError;
use crate::types::{AliasAction, BatchOperationSummary, BulkOperation, IndexDocumentResponse};

/// Abstracts the remote search engine.
///
/// Every method issues one logical request. Implementations surface any
/// non-2xx response, or any response body with an `error` field, as
/// [`SearchIndexError::EngineError`]; callers decide which cases to tolerate
/// using [`SearchIndexError::is_not_found`] and
/// [`SearchIndexError::is_already_exists`]. No method retries on its own.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Store `document` under `(index, doc_type, id)`, replacing any previous
    /// version.
    ///
    /// When `percolate` is true the engine also tests the document against
    /// every registered percolator query and the names of the matching
    /// queries come back in the response.
    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        document: &Value,
        percolate: bool,
    ) -> Result<IndexDocumentResponse, SearchIndexError>;

    /// Remove the document stored under `(index, doc_type, id)`.
    ///
    /// A missing document is reported as a not-found engine error.
    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<(), SearchIndexError>;

    /// Run a search scoped to `(index, doc_type)`.
    ///
    /// A string sort is passed as a URL parameter, a structured sort as part
    /// of the body.
    async fn search(
        &self,
        index: &str,
        doc_type: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError>;

    /// Names of registered percolator queries matching `document`, without
    /// storing it. `filter` narrows which percolator queries are considered.
    async fn percolate(
        &self,
        index: &str,
        doc_type: &str,
        document: &Value,
        filter: Option<&Value>,
    ) -> Result<Vec<String>, SearchIndexError>;

    /// Submit `operations` as a single newline-delimited bulk request.
    ///
    /// Per-item failures are reported in the summary; only a failure of the
    /// request as a whole is returned as an error.
    async fn bulk(
        &self,
        index: &str,
        doc_type: &str,
        operations: &[BulkOperation],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Create `index`, with an optional `{settings, mappings}` body.
    async fn create_index(&self, index: &str, body: Option<&Value>)
        -> Result<(), SearchIndexError>;

    /// Drop `index` and every document in it.
    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Make recent writes to `index` visible to searches.
    async fn refresh_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Apply field definitions for `doc_type`. `mapping` is the body of the
    /// type entry, it is wrapped as `{doc_type: mapping}` on the wire.
    async fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Delete every document of `doc_type` matching `query`. Returns the
    /// number of deleted documents when the engine reports it.
    async fn delete_by_query(
        &self,
        index: &str,
        doc_type: &str,
        query: &Value,
    ) -> Result<u64, SearchIndexError>;

    /// Apply all alias `actions` atomically.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchIndexError>;

    /// Concrete indices currently behind `alias`. Empty when the alias does
    /// not exist.
    async fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>, SearchIndexError>;

    /// Names of indices matching `pattern` (wildcards allowed).
    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>, SearchIndexError>;

    /// Check whether the engine is reachable.
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
