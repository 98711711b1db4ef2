//! Record-aware index administration: reindex, rebuild and versioned deploys.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use search_sync_repository::{BulkOperation, IndexVersion, SearchEngineClient};

use crate::admin::manager::IndexManager;
use crate::config::DEFAULT_REINDEX_BATCH_SIZE;
use crate::errors::SearchSyncError;
use crate::indexable::Indexable;
use crate::record::Record;
use crate::store::{RecordStore, Scope};

/// Outcome of a reindex run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexSummary {
    /// Batches read from the store.
    pub batches: usize,
    /// Documents the engine accepted.
    pub indexed: usize,
    /// Records left out because their `if`/`unless` conditions rejected them.
    pub excluded: usize,
    /// Records skipped because their conditions or projection failed.
    pub skipped: usize,
    /// Documents the engine rejected individually.
    pub failed_documents: usize,
    /// Zero-based numbers of batches whose bulk request failed as a whole.
    pub failed_batches: Vec<usize>,
}

impl ReindexSummary {
    /// True when every record that passed its conditions made it into the index.
    pub fn is_complete(&self) -> bool {
        self.skipped == 0 && self.failed_documents == 0 && self.failed_batches.is_empty()
    }
}

/// Store window covered by a reindex: starting offset, batch size, and
/// whether only that one batch is wanted.
fn reindex_window(per_page: usize, page: Option<usize>) -> (usize, usize, bool) {
    let per_page = per_page.max(1);
    match page {
        Some(page) => (per_page * page.max(1).saturating_sub(1), per_page, true),
        None => (0, per_page, false),
    }
}

/// Index administration for one record kind.
pub struct IndexAdministrator<R> {
    indexable: Arc<Indexable<R>>,
    store: Arc<dyn RecordStore<R>>,
    manager: IndexManager,
    batch_size: usize,
}

impl<R: Record> IndexAdministrator<R> {
    pub fn new(
        indexable: Arc<Indexable<R>>,
        engine: Arc<dyn SearchEngineClient>,
        store: Arc<dyn RecordStore<R>>,
    ) -> Self {
        Self {
            indexable,
            store,
            manager: IndexManager::new(engine),
            batch_size: DEFAULT_REINDEX_BATCH_SIZE,
        }
    }

    /// Store batch size used when `reindex` is called without `per_page`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    pub async fn create_index(&self) -> Result<(), SearchSyncError> {
        self.manager.create_index(self.indexable.descriptor()).await
    }

    pub async fn delete_index(&self) -> Result<(), SearchSyncError> {
        self.manager.delete_index(self.indexable.index()).await
    }

    pub async fn refresh_index(&self) -> Result<(), SearchSyncError> {
        self.manager.refresh_index(self.indexable.index()).await
    }

    pub async fn update_mapping(&self) -> Result<(), SearchSyncError> {
        self.manager
            .update_mapping(self.indexable.descriptor())
            .await
    }

    /// Remove every document of this kind, keeping the index and mapping.
    pub async fn clean_index(&self) -> Result<u64, SearchSyncError> {
        self.manager.clean_index(self.indexable.descriptor()).await
    }

    /// Re-populate the index from the store.
    ///
    /// Without `page` every batch of `scope` is walked; with `page` only that
    /// one batch (1-based) is written. `per_page` defaults to the configured
    /// batch size.
    pub async fn reindex(
        &self,
        scope: &Scope,
        per_page: Option<usize>,
        page: Option<usize>,
    ) -> Result<ReindexSummary, SearchSyncError> {
        self.reindex_into(self.indexable.index(), scope, per_page, page)
            .await
    }

    /// Drop, recreate and fully re-populate the index, then refresh it.
    #[instrument(skip(self), fields(kind = %self.indexable.kind()))]
    pub async fn rebuild_index(&self) -> Result<ReindexSummary, SearchSyncError> {
        info!("Rebuilding index");
        self.delete_index().await?;
        self.create_index().await?;
        let summary = self.reindex(&Scope::All, None, None).await?;
        self.refresh_index().await?;
        info!(
            indexed = summary.indexed,
            skipped = summary.skipped,
            failed_batches = summary.failed_batches.len(),
            "Index rebuilt"
        );
        Ok(summary)
    }

    /// Build a fresh version of the index and move the alias onto it.
    ///
    /// The new version is fully populated and refreshed before the alias is
    /// swapped, so readers never see a partial index.
    #[instrument(skip(self), fields(kind = %self.indexable.kind()))]
    pub async fn create_index_version(
        &self,
    ) -> Result<(IndexVersion, ReindexSummary), SearchSyncError> {
        let version = self
            .manager
            .allocate_version(self.indexable.descriptor())
            .await?;
        let summary = self
            .reindex_into(&version.name, &Scope::All, None, None)
            .await?;
        self.manager.refresh_index(&version.name).await?;
        self.manager.deploy_version(&version).await?;
        Ok((version, summary))
    }

    pub async fn current_index_version(&self) -> Result<Option<IndexVersion>, SearchSyncError> {
        self.manager.current_version(self.indexable.index()).await
    }

    /// Point the alias at `version`. Returns the indices it was moved off.
    pub async fn deploy_index_version(
        &self,
        version: &IndexVersion,
    ) -> Result<Vec<String>, SearchSyncError> {
        self.manager.deploy_version(version).await
    }

    pub async fn index_versions(&self) -> Result<Vec<IndexVersion>, SearchSyncError> {
        self.manager.versions(self.indexable.index()).await
    }

    pub async fn prune_index_versions(&self) -> Result<Vec<IndexVersion>, SearchSyncError> {
        self.manager.prune_versions(self.indexable.index()).await
    }

    /// Bulk-write batches of `scope` into `index`.
    ///
    /// Records rejected by the indexing conditions are left out. Offline mode
    /// does not apply here. Records whose conditions or projection fail, and
    /// failed bulk requests, are logged and skipped. Store errors abort the run.
    #[instrument(skip(self, scope), fields(kind = %self.indexable.kind(), scope = ?scope))]
    async fn reindex_into(
        &self,
        index: &str,
        scope: &Scope,
        per_page: Option<usize>,
        page: Option<usize>,
    ) -> Result<ReindexSummary, SearchSyncError> {
        let (mut offset, limit, single) =
            reindex_window(per_page.unwrap_or(self.batch_size), page);
        let mut summary = ReindexSummary::default();

        info!(offset, batch_size = limit, "Starting reindex");

        loop {
            let records = self.store.find_batch(scope, offset, limit).await?;
            if records.is_empty() {
                break;
            }
            let batch = summary.batches;
            summary.batches += 1;
            let read = records.len();

            let mut operations = Vec::with_capacity(read);
            for record in &records {
                match self.indexable.passes_conditions(record) {
                    Ok(true) => {}
                    Ok(false) => {
                        summary.excluded += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            batch,
                            id = %record.record_id(),
                            error = %e,
                            "Skipping record whose conditions could not be evaluated"
                        );
                        summary.skipped += 1;
                        continue;
                    }
                }
                match self.indexable.project(record) {
                    Ok(document) => {
                        operations.push(BulkOperation::index(record.record_id(), document))
                    }
                    Err(e) => {
                        warn!(
                            batch,
                            id = %record.record_id(),
                            error = %e,
                            "Skipping record that could not be projected"
                        );
                        summary.skipped += 1;
                    }
                }
            }

            if operations.is_empty() {
                debug!(batch, offset, "Nothing to index in batch");
            } else {
                self.write_batch(index, batch, offset, read, &operations, &mut summary)
                    .await;
            }

            if single || read < limit {
                break;
            }
            offset += limit;
        }

        info!(
            batches = summary.batches,
            indexed = summary.indexed,
            excluded = summary.excluded,
            skipped = summary.skipped,
            failed_documents = summary.failed_documents,
            failed_batches = ?summary.failed_batches,
            "Reindex finished"
        );
        Ok(summary)
    }

    async fn write_batch(
        &self,
        index: &str,
        batch: usize,
        offset: usize,
        read: usize,
        operations: &[BulkOperation],
        summary: &mut ReindexSummary,
    ) {
        let result = self
            .manager
            .engine()
            .bulk(index, self.indexable.doc_type(), operations)
            .await;
        match result {
            Ok(result) => {
                summary.indexed += result.succeeded;
                summary.failed_documents += result.failed;
                for failure in result.results.iter().filter(|r| !r.success) {
                    warn!(
                        batch,
                        id = %failure.id,
                        error = ?failure.error,
                        "Document rejected during reindex"
                    );
                }
                debug!(batch, offset, indexed = result.succeeded, "Reindexed batch");
            }
            Err(e) => {
                error!(batch, offset, records = read, error = %e, "Bulk request failed, skipping batch");
                summary.failed_batches.push(batch);
            }
        }
    }
}
