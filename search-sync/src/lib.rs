//! # Search Sync
//!
//! Keeps a search engine index in step with an authoritative record store and
//! serves searches whose results always come from the store.
//!
//! ## Architecture
//!
//! 1. **Indexable**: per-kind configuration (index, projector, conditions, callbacks)
//! 2. **Synchronizer**: turns record commits into queued index writes and deletes
//! 3. **Search**: runs queries, reconciles hits with the store and backfills short pages
//! 4. **Admin**: index lifecycle, bulk reindex and versioned deploys
//!
//! ## Modules
//!
//! - [`admin`]: Index lifecycle and reindexing
//! - [`conditions`]: `if` / `unless` predicates
//! - [`config`]: Configuration and dependency initialization
//! - [`errors`]: Error types
//! - [`indexable`]: Per-kind indexing configuration and callbacks
//! - [`projector`]: Record to document projection
//! - [`runtime`]: Process-wide switches (offline mode, page style)
//! - [`search`]: Search and reconciliation
//! - [`store`]: Authoritative record store boundary
//! - [`synchronizer`]: Index writes, task queue and worker

pub mod admin;
pub mod conditions;
pub mod config;
pub mod errors;
pub mod indexable;
pub mod projector;
pub mod record;
pub mod runtime;
pub mod search;
pub mod store;
pub mod synchronizer;

pub use admin::{IndexAdministrator, IndexManager, ReindexSummary};
pub use conditions::Predicate;
pub use config::{Dependencies, SearchSyncConfig};
pub use errors::SearchSyncError;
pub use indexable::{CallbackEvent, IndexOutcome, Indexable, IndexableBuilder};
pub use projector::DocumentProjector;
pub use record::{Record, RecordId};
pub use runtime::RuntimeContext;
pub use search::SearchService;
pub use store::{RecordStore, Scope};
pub use synchronizer::{
    ChannelTaskQueue, IndexAction, IndexSynchronizer, IndexTask, Lifecycle, TaskQueue, TaskWorker,
};
