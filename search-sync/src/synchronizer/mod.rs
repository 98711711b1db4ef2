//! Indexing synchronizer.
//!
//! Reacts to record commits by queueing index writes, and performs those
//! writes when the queue hands them back. Commit hooks never fail: anything
//! that goes wrong is logged, so record persistence is never affected by the
//! state of the search engine.
//!
//! ## Flow
//!
//! 1. `on_create_commit` / `on_update_commit` check the record's conditions
//!    and queue an index task on the configured lane.
//! 2. `on_destroy_commit` always queues a delete task.
//! 3. A [`TaskWorker`] hands the task back to [`IndexSynchronizer::perform`],
//!    which reloads the record, writes its document and fires callbacks.

mod queue;
mod task;
mod worker;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

pub use queue::{ChannelTaskQueue, TaskQueue, DEFAULT_LANE_BUFFER};
pub use task::{IndexAction, IndexTask, Lifecycle};
pub use worker::{TaskHandler, TaskWorker, WorkerConfig, WorkerStats};

use search_sync_repository::SearchEngineClient;

use crate::errors::SearchSyncError;
use crate::indexable::{Indexable, IndexOutcome};
use crate::record::Record;
use crate::runtime::RuntimeContext;
use crate::store::RecordStore;

/// Drives index writes and deletes for one record kind.
pub struct IndexSynchronizer<R> {
    indexable: Arc<Indexable<R>>,
    engine: Arc<dyn SearchEngineClient>,
    store: Arc<dyn RecordStore<R>>,
    queue: Arc<dyn TaskQueue>,
    runtime: RuntimeContext,
}

impl<R: Record> IndexSynchronizer<R> {
    pub fn new(
        indexable: Arc<Indexable<R>>,
        engine: Arc<dyn SearchEngineClient>,
        store: Arc<dyn RecordStore<R>>,
        queue: Arc<dyn TaskQueue>,
        runtime: RuntimeContext,
    ) -> Self {
        Self {
            indexable,
            engine,
            store,
            queue,
            runtime,
        }
    }

    pub fn indexable(&self) -> &Arc<Indexable<R>> {
        &self.indexable
    }

    /// Commit hook for a newly created record. Returns whether a task was
    /// queued.
    pub async fn on_create_commit(&self, record: &R) -> bool {
        self.queue_index(record, Lifecycle::Create).await
    }

    /// Commit hook for an updated record. Returns whether a task was queued.
    pub async fn on_update_commit(&self, record: &R) -> bool {
        self.queue_index(record, Lifecycle::Update).await
    }

    /// Commit hook for a destroyed record.
    ///
    /// Deletes are not gated by conditions or the offline flag, so a record
    /// that was indexed and later stopped qualifying can still be removed.
    pub async fn on_destroy_commit(&self, id: &str) -> bool {
        let task = IndexTask::delete(self.indexable.kind(), id);
        self.enqueue(task).await
    }

    async fn queue_index(&self, record: &R, lifecycle: Lifecycle) -> bool {
        let id = record.record_id();
        match self.indexable.should_index(record, &self.runtime) {
            Ok(true) => {
                let task = IndexTask::index(self.indexable.kind(), id, lifecycle);
                self.enqueue(task).await
            }
            Ok(false) => {
                debug!(
                    kind = %self.indexable.kind(),
                    id = %id,
                    lifecycle = %lifecycle,
                    offline = self.runtime.is_offline(),
                    "Record skipped by indexing conditions"
                );
                false
            }
            Err(e) => {
                error!(
                    kind = %self.indexable.kind(),
                    id = %id,
                    error = %e,
                    "Failed to evaluate indexing conditions"
                );
                false
            }
        }
    }

    async fn enqueue(&self, task: IndexTask) -> bool {
        let kind = task.kind.clone();
        let id = task.action.id().to_string();
        match self.queue.enqueue(task, self.indexable.lane()).await {
            Ok(()) => true,
            Err(e) => {
                error!(kind = %kind, id = %id, error = %e, "Failed to enqueue index task");
                false
            }
        }
    }

    /// Execute a queued action.
    ///
    /// Index actions reload the record first; a record deleted in the
    /// meantime is skipped. Returns the write outcome for index actions.
    #[instrument(skip(self), fields(kind = %self.indexable.kind()))]
    pub async fn perform(&self, action: IndexAction) -> Result<Option<IndexOutcome>, SearchSyncError> {
        match action {
            IndexAction::Index { id, lifecycle } => match self.store.find(&id).await? {
                Some(record) => self.index_record(&record, lifecycle).await.map(Some),
                None => {
                    info!(id = %id, "Record no longer exists, skipping index write");
                    Ok(None)
                }
            },
            IndexAction::Delete { id } => {
                self.delete_document(&id).await?;
                Ok(None)
            }
        }
    }

    /// Write the document of `record` now and fire callbacks.
    pub async fn index_record(
        &self,
        record: &R,
        lifecycle: Lifecycle,
    ) -> Result<IndexOutcome, SearchSyncError> {
        let id = record.record_id();
        let document = self.indexable.project(record)?;

        let response = self
            .engine
            .index_document(
                self.indexable.index(),
                self.indexable.doc_type(),
                &id,
                &document,
                self.indexable.percolates(),
            )
            .await?;

        let outcome = IndexOutcome {
            id,
            lifecycle,
            matches: response.matches,
        };
        debug!(
            id = %outcome.id,
            lifecycle = %lifecycle,
            matches = ?outcome.matches,
            "Record indexed"
        );

        self.indexable
            .callbacks()
            .fire_after_write(record, &outcome);
        Ok(outcome)
    }

    /// Remove the document with `id`. A document that is already gone is not
    /// an error.
    pub async fn delete_document(&self, id: &str) -> Result<(), SearchSyncError> {
        match self
            .engine
            .delete_document(self.indexable.index(), self.indexable.doc_type(), id)
            .await
        {
            Ok(()) => {
                debug!(id = %id, "Document removed from index");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(id = %id, error = %e, "Document already absent from index");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of percolator queries matching `record`, without writing it.
    ///
    /// Works for records that were never persisted. `filter` narrows the
    /// percolator queries considered.
    pub async fn percolate(
        &self,
        record: &R,
        filter: Option<&Value>,
    ) -> Result<Vec<String>, SearchSyncError> {
        let document = self.indexable.project(record)?;
        let matches = self
            .engine
            .percolate(
                self.indexable.index(),
                self.indexable.doc_type(),
                &document,
                filter,
            )
            .await?;
        Ok(matches)
    }
}

#[async_trait]
impl<R: Record> TaskHandler for IndexSynchronizer<R> {
    async fn handle(&self, action: IndexAction) -> Result<(), SearchSyncError> {
        self.perform(action).await.map(|_| ())
    }
}
