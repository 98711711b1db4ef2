//! Interface definitions for the search engine boundary.
//!
//! This module defines the abstract `SearchEngineClient` trait so the service
//! crate can be wired against OpenSearch in production and an in-memory engine
//! in tests.

mod search_engine_client;

pub use search_engine_client::SearchEngineClient;
