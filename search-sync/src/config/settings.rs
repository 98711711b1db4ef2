//! Immutable configuration read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use search_sync_repository::config::DEFAULT_ENGINE_URL;
use search_sync_repository::SearchEngineConfig;
use search_sync_shared::PageStyle;
use tracing::warn;

/// Default logical index name.
pub const DEFAULT_INDEX: &str = "search_sync";

/// Default page size for searches.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Default cap on backfill re-queries per search.
pub const DEFAULT_MAX_BACKFILL_ROUNDS: usize = 10;

/// Default number of records per reindex batch.
pub const DEFAULT_REINDEX_BATCH_SIZE: usize = 1000;

/// Default task lane for index writes.
pub const DEFAULT_TASK_LANE: &str = "search_index";

/// Default connection retry interval in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// Fail immediately if the engine is unreachable.
    FailFast,
    /// Retry until the engine answers.
    #[default]
    Retry,
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            "retry" => Ok(Self::Retry),
            other => Err(format!("unknown connection mode '{}'", other)),
        }
    }
}

/// Configuration for the synchronization layer.
///
/// Built once at startup and passed to constructors. The only state that
/// changes at runtime lives in [`crate::RuntimeContext`].
#[derive(Debug, Clone)]
pub struct SearchSyncConfig {
    pub engine_url: String,
    pub default_index: String,
    pub per_page: usize,
    pub max_backfill_rounds: usize,
    pub reindex_batch_size: usize,
    pub task_lane: String,
    pub page_style: PageStyle,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
}

impl Default for SearchSyncConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            default_index: DEFAULT_INDEX.to_string(),
            per_page: DEFAULT_PER_PAGE,
            max_backfill_rounds: DEFAULT_MAX_BACKFILL_ROUNDS,
            reindex_batch_size: DEFAULT_REINDEX_BATCH_SIZE,
            task_lane: DEFAULT_TASK_LANE.to_string(),
            page_style: PageStyle::default(),
            connection_mode: ConnectionMode::default(),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }
}

impl SearchSyncConfig {
    /// Read configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_ENGINE_URL`: engine base URL (default: http://localhost:9200)
    /// - `SEARCH_DEFAULT_INDEX`: logical index name (default: search_sync)
    /// - `SEARCH_PER_PAGE`: default page size (default: 20)
    /// - `SEARCH_MAX_BACKFILL_ROUNDS`: backfill re-query cap (default: 10)
    /// - `SEARCH_REINDEX_BATCH_SIZE`: records per reindex batch (default: 1000)
    /// - `SEARCH_TASK_LANE`: task lane for index writes (default: search_index)
    /// - `SEARCH_PAGE_STYLE`: "offset" or "count" (default: offset)
    /// - `SEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `SEARCH_RETRY_INTERVAL_SECS`: retry interval in seconds (default: 15)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            engine_url: parsed("SEARCH_ENGINE_URL").unwrap_or(defaults.engine_url),
            default_index: parsed("SEARCH_DEFAULT_INDEX").unwrap_or(defaults.default_index),
            per_page: parse_or("SEARCH_PER_PAGE", parsed("SEARCH_PER_PAGE"), defaults.per_page)
                .max(1),
            max_backfill_rounds: parse_or(
                "SEARCH_MAX_BACKFILL_ROUNDS",
                parsed("SEARCH_MAX_BACKFILL_ROUNDS"),
                defaults.max_backfill_rounds,
            ),
            reindex_batch_size: parse_or(
                "SEARCH_REINDEX_BATCH_SIZE",
                parsed("SEARCH_REINDEX_BATCH_SIZE"),
                defaults.reindex_batch_size,
            )
            .max(1),
            task_lane: parsed("SEARCH_TASK_LANE").unwrap_or(defaults.task_lane),
            page_style: parse_or(
                "SEARCH_PAGE_STYLE",
                parsed("SEARCH_PAGE_STYLE"),
                defaults.page_style,
            ),
            connection_mode: parse_or(
                "SEARCH_CONNECTION_MODE",
                parsed("SEARCH_CONNECTION_MODE"),
                defaults.connection_mode,
            ),
            retry_interval: Duration::from_secs(parse_or(
                "SEARCH_RETRY_INTERVAL_SECS",
                parsed("SEARCH_RETRY_INTERVAL_SECS"),
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
        }
    }

    /// Engine client configuration derived from this config.
    pub fn engine_config(&self) -> SearchEngineConfig {
        SearchEngineConfig::new(self.engine_url.clone())
            .with_max_batch_size(self.reindex_batch_size.max(1000))
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match value {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key = %key, value = %raw, "Invalid configuration value, using default");
                default
            }
        },
        None => default,
    }
}
