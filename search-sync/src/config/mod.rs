//! Configuration and dependency wiring.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{
    ConnectionMode, SearchSyncConfig, DEFAULT_INDEX, DEFAULT_MAX_BACKFILL_ROUNDS, DEFAULT_PER_PAGE,
    DEFAULT_REINDEX_BATCH_SIZE, DEFAULT_RETRY_INTERVAL_SECS, DEFAULT_TASK_LANE,
};
