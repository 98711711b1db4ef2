//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend.

mod index_config;
mod provider;

pub use index_config::{create_index_body, default_settings, IndexVersion};
pub use provider::OpenSearchEngine;
