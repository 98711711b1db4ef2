//! # Search Sync Repository
//!
//! This crate owns the boundary with the remote search engine. It defines the
//! `SearchEngineClient` trait, the unified error type, index settings and
//! version helpers, and a concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use config::SearchEngineConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchEngineClient;
pub use self::opensearch::{create_index_body, IndexVersion, OpenSearchEngine};
pub use types::{
    AliasAction, BatchOperationResult, BatchOperationSummary, BulkOperation, IndexDocumentResponse,
};
pub use utils::{escape_query, escape_query_grouped};
