//! Search and reconciliation.
//!
//! The engine only supplies ids; records always come from the store. Ids
//! whose record is gone are stale documents: they are queued for deletion and
//! the engine is asked for more hits until the page is full again.
//!
//! ## Backfill
//!
//! Each round requests `per_page - live` more hits, starting where the
//! previous request ended. The loop stops when the page is full, when the
//! engine returns fewer hits than asked for (the index is exhausted), or after
//! `max_backfill_rounds` re-queries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use search_sync_repository::SearchEngineClient;
use search_sync_shared::{
    page_offset, HitRecord, Paginated, SearchHit, SearchOptions, SearchQuery, SearchRequest,
    SearchResponse, Sort,
};

use crate::config::DEFAULT_MAX_BACKFILL_ROUNDS;
use crate::errors::SearchSyncError;
use crate::indexable::Indexable;
use crate::record::Record;
use crate::runtime::RuntimeContext;
use crate::store::RecordStore;
use crate::synchronizer::{IndexTask, TaskQueue};

/// Runs searches for one record kind and reconciles hits with the store.
pub struct SearchService<R> {
    indexable: Arc<Indexable<R>>,
    engine: Arc<dyn SearchEngineClient>,
    store: Arc<dyn RecordStore<R>>,
    queue: Arc<dyn TaskQueue>,
    runtime: RuntimeContext,
    max_backfill_rounds: usize,
}

/// Reconciled hits of one search.
struct Reconciled<R> {
    records: Vec<HitRecord<R>>,
    missing: usize,
}

impl<R: Record> SearchService<R> {
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
            max_backfill_rounds: DEFAULT_MAX_BACKFILL_ROUNDS,
        }
    }

    pub fn with_max_backfill_rounds(mut self, rounds: usize) -> Self {
        self.max_backfill_rounds = rounds;
        self
    }

    /// Search and return a page of live records in engine order.
    ///
    /// `total_entries` is the engine count minus the stale ids found while
    /// filling the page.
    #[instrument(skip(self, query, options), fields(kind = %self.indexable.kind()))]
    pub async fn search(
        &self,
        query: impl Into<SearchQuery> + Send,
        options: &SearchOptions,
    ) -> Result<Paginated<HitRecord<R>>, SearchSyncError> {
        let page = options.resolve_page()?;
        let per_page =
            options.resolve_per_page(self.indexable.per_page(), self.indexable.max_per_page())?;
        let clause = query.into().to_query_clause(options.default_operator);
        let from = page_offset(page, per_page)?;

        let first = self
            .run_query(
                SearchRequest::ids_only(clause.clone(), from, per_page)
                    .with_sort(options.sort.clone()),
            )
            .await?;
        let engine_total = first.total;

        let reconciled = self
            .reconcile(first.hits, &clause, options.sort.as_ref(), from, per_page)
            .await?;

        let total = engine_total.saturating_sub(reconciled.missing as u64) as usize;
        debug!(
            page,
            per_page,
            engine_total,
            missing = reconciled.missing,
            returned = reconciled.records.len(),
            "Search reconciled"
        );

        let paginated = self.runtime.page_style().paginate(
            reconciled.records,
            page,
            per_page,
            Some(total),
        )?;
        Ok(paginated)
    }

    /// Raw engine match count for `query`. Stale documents are counted.
    #[instrument(skip(self, query), fields(kind = %self.indexable.kind()))]
    pub async fn search_count(
        &self,
        query: impl Into<SearchQuery> + Send,
    ) -> Result<u64, SearchSyncError> {
        let clause = query.into().to_query_clause(None);
        let response = self.run_query(SearchRequest::ids_only(clause, 0, 0)).await?;
        Ok(response.total)
    }

    async fn run_query(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, SearchSyncError> {
        let response = self
            .engine
            .search(self.indexable.index(), self.indexable.doc_type(), &request)
            .await?;
        Ok(response)
    }

    async fn reconcile(
        &self,
        mut hits: Vec<SearchHit>,
        clause: &Value,
        sort: Option<&Sort>,
        mut from: usize,
        per_page: usize,
    ) -> Result<Reconciled<R>, SearchSyncError> {
        let mut records: Vec<HitRecord<R>> = Vec::with_capacity(per_page);
        let mut seen: HashSet<String> = HashSet::new();
        let mut missing = 0;
        let mut requested = per_page;
        let mut rounds = 0;

        loop {
            let returned = hits.len();
            let fresh: Vec<SearchHit> = hits
                .into_iter()
                .filter(|hit| seen.insert(hit.id.clone()))
                .collect();

            let ids: Vec<String> = fresh.iter().map(|hit| hit.id.clone()).collect();
            let mut found: HashMap<String, R> = if ids.is_empty() {
                HashMap::new()
            } else {
                self.store
                    .find_by_ids(&ids)
                    .await?
                    .into_iter()
                    .map(|record| (record.record_id(), record))
                    .collect()
            };

            for hit in fresh {
                match found.remove(&hit.id) {
                    Some(record) if records.len() < per_page => {
                        records.push(HitRecord::new(record, hit))
                    }
                    Some(_) => {}
                    None => {
                        missing += 1;
                        self.schedule_removal(&hit.id).await;
                    }
                }
            }

            if records.len() >= per_page || returned < requested {
                break;
            }
            if rounds >= self.max_backfill_rounds {
                warn!(
                    rounds,
                    live = records.len(),
                    per_page,
                    "Backfill cap reached, returning a short page"
                );
                break;
            }

            from = match from.checked_add(requested) {
                Some(next) => next,
                None => break,
            };
            rounds += 1;
            requested = per_page - records.len();
            debug!(round = rounds, from, size = requested, "Backfilling page");

            hits = self
                .run_query(
                    SearchRequest::ids_only(clause.clone(), from, requested)
                        .with_sort(sort.cloned()),
                )
                .await?
                .hits;
        }

        Ok(Reconciled { records, missing })
    }

    /// Queue a background delete for a stale document. Failures are logged.
    async fn schedule_removal(&self, id: &str) {
        let task = IndexTask::delete(self.indexable.kind(), id);
        match self.queue.enqueue(task, self.indexable.lane()).await {
            Ok(()) => debug!(id = %id, "Queued removal of stale document"),
            Err(e) => warn!(id = %id, error = %e, "Failed to queue removal of stale document"),
        }
    }
}
