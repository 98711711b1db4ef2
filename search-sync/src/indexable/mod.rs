//! Per-kind indexing configuration.
//!
//! An `Indexable<R>` ties a record type to its index: where documents live,
//! how a record is projected, which records qualify, page size limits and the
//! callbacks fired after writes. The synchronizer, the search service and the
//! administrator all share one through an `Arc`.

mod callbacks;

use serde_json::Value;

pub use callbacks::{Callback, CallbackEvent, Callbacks, IndexOutcome};

use search_sync_shared::IndexDescriptor;

use crate::conditions::{ConditionSet, Predicate};
use crate::config::{SearchSyncConfig, DEFAULT_PER_PAGE, DEFAULT_TASK_LANE};
use crate::errors::SearchSyncError;
use crate::projector::DocumentProjector;
use crate::record::Record;
use crate::runtime::RuntimeContext;

/// Indexing configuration for one record kind.
pub struct Indexable<R> {
    descriptor: IndexDescriptor,
    per_page: usize,
    max_per_page: Option<usize>,
    percolate: bool,
    lane: String,
    projector: DocumentProjector<R>,
    conditions: ConditionSet<R>,
    callbacks: Callbacks<R>,
}

impl<R: Record> Indexable<R> {
    pub fn builder(descriptor: IndexDescriptor) -> IndexableBuilder<R> {
        IndexableBuilder::new(descriptor)
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    pub fn index(&self) -> &str {
        &self.descriptor.index
    }

    pub fn doc_type(&self) -> &str {
        &self.descriptor.doc_type
    }

    /// Routing key for tasks of this kind, `index/type`.
    pub fn kind(&self) -> String {
        format!("{}/{}", self.descriptor.index, self.descriptor.doc_type)
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn max_per_page(&self) -> Option<usize> {
        self.max_per_page
    }

    pub fn percolates(&self) -> bool {
        self.percolate
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    pub fn callbacks(&self) -> &Callbacks<R> {
        &self.callbacks
    }

    pub fn project(&self, record: &R) -> Result<Value, SearchSyncError> {
        self.projector.project(record)
    }

    /// Whether `record` should be synchronized right now.
    ///
    /// Always false while the runtime is offline.
    pub fn should_index(
        &self,
        record: &R,
        runtime: &RuntimeContext,
    ) -> Result<bool, SearchSyncError> {
        if runtime.is_offline() {
            return Ok(false);
        }
        self.passes_conditions(record)
    }

    /// Evaluate the `if`/`unless` conditions alone, ignoring offline mode.
    pub fn passes_conditions(&self, record: &R) -> Result<bool, SearchSyncError> {
        self.conditions.evaluate(record, &self.projector)
    }
}

/// Builder for [`Indexable`].
pub struct IndexableBuilder<R> {
    descriptor: IndexDescriptor,
    per_page: usize,
    max_per_page: Option<usize>,
    percolate: bool,
    lane: String,
    projector: Option<DocumentProjector<R>>,
    if_predicates: Vec<Predicate<R>>,
    unless_predicates: Vec<Predicate<R>>,
    callbacks: Callbacks<R>,
}

impl<R: Record> IndexableBuilder<R> {
    pub fn new(descriptor: IndexDescriptor) -> Self {
        Self {
            descriptor,
            per_page: DEFAULT_PER_PAGE,
            max_per_page: None,
            percolate: false,
            lane: DEFAULT_TASK_LANE.to_string(),
            projector: None,
            if_predicates: Vec::new(),
            unless_predicates: Vec::new(),
            callbacks: Callbacks::default(),
        }
    }

    /// Take the default page size and task lane from `config`.
    pub fn with_config(mut self, config: &SearchSyncConfig) -> Self {
        self.per_page = config.per_page;
        self.lane = config.task_lane.clone();
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn max_per_page(mut self, max_per_page: usize) -> Self {
        self.max_per_page = Some(max_per_page);
        self
    }

    /// Test every written document against registered percolator queries.
    pub fn percolate(mut self, percolate: bool) -> Self {
        self.percolate = percolate;
        self
    }

    pub fn lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = lane.into();
        self
    }

    pub fn projector(mut self, projector: DocumentProjector<R>) -> Self {
        self.projector = Some(projector);
        self
    }

    pub fn project_with<F>(self, f: F) -> Self
    where
        F: Fn(&R) -> Result<Value, SearchSyncError> + Send + Sync + 'static,
    {
        self.projector(DocumentProjector::new(f))
    }

    pub fn index_if(mut self, predicate: Predicate<R>) -> Self {
        self.if_predicates.push(predicate);
        self
    }

    pub fn index_unless(mut self, predicate: Predicate<R>) -> Self {
        self.unless_predicates.push(predicate);
        self
    }

    pub fn on(mut self, event: CallbackEvent, callback: Callback<R>) -> Self {
        self.callbacks.register(event, callback);
        self
    }

    pub fn after_index<F>(self, f: F) -> Self
    where
        F: Fn(&R, &IndexOutcome) + Send + Sync + 'static,
    {
        self.on(CallbackEvent::AfterIndex, std::sync::Arc::new(f))
    }

    pub fn after_index_on_create<F>(self, f: F) -> Self
    where
        F: Fn(&R, &IndexOutcome) + Send + Sync + 'static,
    {
        self.on(CallbackEvent::AfterIndexOnCreate, std::sync::Arc::new(f))
    }

    pub fn after_index_on_update<F>(self, f: F) -> Self
    where
        F: Fn(&R, &IndexOutcome) + Send + Sync + 'static,
    {
        self.on(CallbackEvent::AfterIndexOnUpdate, std::sync::Arc::new(f))
    }

    pub fn after_percolate<F>(self, f: F) -> Self
    where
        F: Fn(&R, &IndexOutcome) + Send + Sync + 'static,
    {
        self.on(CallbackEvent::AfterPercolate, std::sync::Arc::new(f))
    }

    /// Validate options and resolve condition references.
    pub fn build(self) -> Result<Indexable<R>, SearchSyncError> {
        if self.descriptor.index.is_empty() || self.descriptor.doc_type.is_empty() {
            return Err(SearchSyncError::config(
                "index descriptor needs an index and a type name",
            ));
        }
        if self.per_page < 1 {
            return Err(SearchSyncError::config("per_page cannot be less than 1"));
        }
        if self.max_per_page == Some(0) {
            return Err(SearchSyncError::config("max_per_page cannot be less than 1"));
        }
        if self.lane.is_empty() {
            return Err(SearchSyncError::config("task lane cannot be empty"));
        }
        let projector = self.projector.ok_or_else(|| {
            SearchSyncError::config(format!(
                "no document projector configured for {}/{}",
                self.descriptor.index, self.descriptor.doc_type
            ))
        })?;
        let conditions = ConditionSet::resolve(self.if_predicates, self.unless_predicates)?;

        Ok(Indexable {
            descriptor: self.descriptor,
            per_page: self.per_page,
            max_per_page: self.max_per_page,
            percolate: self.percolate,
            lane: self.lane,
            projector,
            conditions,
            callbacks: self.callbacks,
        })
    }
}
