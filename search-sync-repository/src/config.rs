//! Configuration types for the search engine client.

use std::time::Duration;

/// Default engine base URL.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:9200";

/// Configuration for a search engine client.
///
/// The base URL is always supplied from the outside (environment or config
/// file); nothing in the core logic hardcodes it.
#[derive(Debug, Clone)]
pub struct SearchEngineConfig {
    /// Engine base URL, e.g. `http://localhost:9200`.
    pub url: String,

    /// Maximum number of documents allowed in a single bulk request.
    ///
    /// Set to `None` to disable the limit. Defaults to 1000.
    pub max_batch_size: Option<usize>,

    /// Per-request timeout applied by the transport.
    pub request_timeout: Option<Duration>,
}

impl Default for SearchEngineConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENGINE_URL.to_string(),
            max_batch_size: Some(1000),
            request_timeout: None,
        }
    }
}

impl SearchEngineConfig {
    /// Create a config for the given base URL with default limits.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Remove the bulk size limit.
    ///
    /// # Warning
    ///
    /// Very large bulk bodies can time out or exhaust engine memory.
    pub fn unlimited(mut self) -> Self {
        self.max_batch_size = None;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
