//! In-memory collaborators shared by the integration tests.
//!
//! `InMemoryEngine` follows the engine's observable behaviour closely enough
//! for the services under test: per-index document storage, aliases, basic
//! query-string matching, sorting, from/size paging and the engine's
//! "not found" / "already exists" errors.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use search_sync::{
    DocumentProjector, IndexTask, Indexable, Record, RecordId, RecordStore, RuntimeContext, Scope,
    SearchSyncError, TaskQueue,
};
use search_sync_repository::{
    AliasAction, BatchOperationResult, BatchOperationSummary, BulkOperation,
    IndexDocumentResponse, SearchEngineClient, SearchIndexError,
};
use search_sync_shared::{
    IndexDescriptor, SearchHit, SearchRequest, SearchResponse, SortDirection,
};

// ---------------------------------------------------------------------------
// Records

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub published: bool,
}

impl Post {
    pub fn new(id: u64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            published: true,
        }
    }

    pub fn draft(id: u64, title: &str) -> Self {
        Self {
            published: false,
            ..Self::new(id, title)
        }
    }
}

impl Record for Post {
    fn record_id(&self) -> RecordId {
        self.id.to_string()
    }

    fn named_predicate(name: &str) -> Option<fn(&Self) -> bool> {
        match name {
            "is_published" => Some(|post: &Post| post.published),
            _ => None,
        }
    }
}

pub const INDEX: &str = "blog";
pub const DOC_TYPE: &str = "posts";
pub const LANE: &str = "search";

pub fn descriptor() -> IndexDescriptor {
    IndexDescriptor::new(INDEX, DOC_TYPE)
}

/// Indexable for `Post` with the serialized projector and the test lane.
pub fn post_indexable() -> search_sync::IndexableBuilder<Post> {
    Indexable::<Post>::builder(descriptor())
        .lane(LANE)
        .projector(DocumentProjector::serialized())
}

// ---------------------------------------------------------------------------
// Engine

#[derive(Debug, Clone)]
struct StoredDocument {
    doc_type: String,
    id: String,
    source: Value,
}

#[derive(Debug, Default)]
struct StoredIndex {
    body: Option<Value>,
    documents: Vec<StoredDocument>,
    mappings: BTreeMap<String, Value>,
    aliases: BTreeSet<String>,
    refreshes: usize,
}

#[derive(Debug, Default)]
struct EngineState {
    indices: BTreeMap<String, StoredIndex>,
    percolator_matches: Vec<String>,
    failing_bulk_calls: HashSet<usize>,
    rejected_ids: HashSet<String>,
    bulk_calls: usize,
    searches: Vec<SearchRequest>,
    healthy: bool,
}

/// Search engine double holding documents in memory.
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self {
            state: Mutex::new(EngineState {
                healthy: true,
                ..EngineState::default()
            }),
        }
    }
}

fn not_found(what: &str) -> SearchIndexError {
    SearchIndexError::engine(404, format!("{} not_found", what))
}

fn text_of(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(&s.to_lowercase());
            out.push(' ');
        }
        Value::Number(n) => {
            out.push_str(&n.to_string());
            out.push(' ');
        }
        Value::Bool(b) => {
            out.push_str(&b.to_string());
            out.push(' ');
        }
        Value::Array(items) => items.iter().for_each(|v| text_of(v, out)),
        Value::Object(map) => map.values().for_each(|v| text_of(v, out)),
        Value::Null => {}
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn same_scalar(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => scalar_text(left) == scalar_text(right),
    }
}

fn matches_query(query: &Value, document: &StoredDocument) -> bool {
    if query.get("match_all").is_some() {
        return true;
    }
    if let Some(term) = query.get("term").and_then(Value::as_object) {
        return term
            .iter()
            .all(|(field, expected)| match document.source.get(field) {
                Some(actual) => same_scalar(actual, expected),
                None => false,
            });
    }
    if let Some(text) = query
        .get("query_string")
        .and_then(|q| q.get("query"))
        .and_then(Value::as_str)
    {
        let text = text.trim();
        if text == "*" || text.is_empty() {
            return true;
        }
        if let Some((field, expected)) = text.split_once(':') {
            return document
                .source
                .get(field)
                .map(|actual| same_scalar(actual, &Value::String(expected.to_string())))
                .unwrap_or(false);
        }
        let mut haystack = String::new();
        text_of(&document.source, &mut haystack);
        return text
            .to_lowercase()
            .split_whitespace()
            .all(|word| haystack.contains(word));
    }
    false
}

fn sort_key<'a>(document: &'a StoredDocument, field: &str) -> Option<&'a Value> {
    document.source.get(field)
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(l), Some(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            _ => l.to_string().cmp(&r.to_string()),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(state: &EngineState, name: &str) -> Vec<String> {
        if state.indices.contains_key(name) {
            return vec![name.to_string()];
        }
        state
            .indices
            .iter()
            .filter(|(_, index)| index.aliases.contains(name))
            .map(|(index_name, _)| index_name.clone())
            .collect()
    }

    /// Write a document straight into the engine, bypassing the services.
    pub fn seed(&self, index: &str, doc_type: &str, id: &str, source: Value) {
        let mut state = self.state.lock().unwrap();
        let target = Self::resolve(&state, index)
            .into_iter()
            .next()
            .unwrap_or_else(|| index.to_string());
        let stored = state.indices.entry(target).or_default();
        stored
            .documents
            .retain(|d| !(d.doc_type == doc_type && d.id == id));
        stored.documents.push(StoredDocument {
            doc_type: doc_type.to_string(),
            id: id.to_string(),
            source,
        });
    }

    pub fn document(&self, index: &str, doc_type: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        Self::resolve(&state, index).iter().find_map(|name| {
            state.indices[name]
                .documents
                .iter()
                .find(|d| d.doc_type == doc_type && d.id == id)
                .map(|d| d.source.clone())
        })
    }

    /// Ids stored in `index` (or the index behind an alias), sorted.
    pub fn document_ids(&self, index: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut ids = Vec::new();
        for name in Self::resolve(&state, index) {
            ids.extend(state.indices[&name].documents.iter().map(|d| d.id.clone()));
        }
        ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
        ids
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().unwrap().indices.contains_key(index)
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().unwrap().indices.keys().cloned().collect()
    }

    pub fn index_body(&self, index: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .and_then(|i| i.body.clone())
    }

    pub fn mapping(&self, index: &str, doc_type: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .and_then(|i| i.mappings.get(doc_type).cloned())
    }

    pub fn refresh_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map(|i| i.refreshes)
            .unwrap_or(0)
    }

    pub fn aliased_indices(&self, alias: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .indices
            .iter()
            .filter(|(_, i)| i.aliases.contains(alias))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names returned by every percolation from now on.
    pub fn set_percolator_matches(&self, matches: &[&str]) {
        self.state.lock().unwrap().percolator_matches =
            matches.iter().map(|m| m.to_string()).collect();
    }

    /// Make the `n`th bulk call (zero-based) fail as a whole.
    pub fn fail_bulk_call(&self, n: usize) {
        self.state.lock().unwrap().failing_bulk_calls.insert(n);
    }

    /// Reject the document with `id` inside bulk requests.
    pub fn reject_document(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_ids
            .insert(id.to_string());
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.lock().unwrap().healthy = healthy;
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn bulk_calls(&self) -> usize {
        self.state.lock().unwrap().bulk_calls
    }
}

#[async_trait]
impl SearchEngineClient for InMemoryEngine {
    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        document: &Value,
        percolate: bool,
    ) -> Result<IndexDocumentResponse, SearchIndexError> {
        self.seed(index, doc_type, id, document.clone());
        let matches = if percolate {
            self.state.lock().unwrap().percolator_matches.clone()
        } else {
            Vec::new()
        };
        Ok(IndexDocumentResponse::new(matches))
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        let targets = Self::resolve(&state, index);
        if targets.is_empty() {
            return Err(not_found("index"));
        }
        let mut removed = false;
        for name in targets {
            if let Some(stored) = state.indices.get_mut(&name) {
                let before = stored.documents.len();
                stored
                    .documents
                    .retain(|d| !(d.doc_type == doc_type && d.id == id));
                removed |= stored.documents.len() != before;
            }
        }
        if removed {
            Ok(())
        } else {
            Err(not_found("document"))
        }
    }

    async fn search(
        &self,
        index: &str,
        doc_type: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(request.clone());
        let targets = Self::resolve(&state, index);
        if targets.is_empty() {
            return Err(not_found("index"));
        }

        let mut matched: Vec<(String, StoredDocument)> = Vec::new();
        for name in &targets {
            for document in &state.indices[name].documents {
                if document.doc_type == doc_type && matches_query(&request.query, document) {
                    matched.push((name.clone(), document.clone()));
                }
            }
        }

        if let Some(sort) = &request.sort {
            let fields = sort
                .to_fields()
                .map_err(|e| SearchIndexError::engine(400, e))?;
            matched.sort_by(|(_, a), (_, b)| {
                fields
                    .iter()
                    .map(|f| {
                        let ordering =
                            compare_values(sort_key(a, &f.field), sort_key(b, &f.field));
                        match f.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(name, d)| {
                let mut hit = SearchHit::new(d.id);
                hit.index = Some(name);
                hit.doc_type = Some(d.doc_type);
                hit
            })
            .collect();
        Ok(SearchResponse::new(hits, total, 1))
    }

    async fn percolate(
        &self,
        index: &str,
        _doc_type: &str,
        _document: &Value,
        filter: Option<&Value>,
    ) -> Result<Vec<String>, SearchIndexError> {
        let state = self.state.lock().unwrap();
        if Self::resolve(&state, index).is_empty() {
            return Err(not_found("index"));
        }
        let matches = state.percolator_matches.clone();
        // A filter narrows to the query names it lists under `ids.values`.
        match filter
            .and_then(|f| f.get("ids"))
            .and_then(|ids| ids.get("values"))
            .and_then(Value::as_array)
        {
            Some(allowed) => Ok(matches
                .into_iter()
                .filter(|m| allowed.iter().any(|a| a.as_str() == Some(m.as_str())))
                .collect()),
            None => Ok(matches),
        }
    }

    async fn bulk(
        &self,
        index: &str,
        doc_type: &str,
        operations: &[BulkOperation],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        {
            let mut state = self.state.lock().unwrap();
            let call = state.bulk_calls;
            state.bulk_calls += 1;
            if state.failing_bulk_calls.contains(&call) {
                return Err(SearchIndexError::bulk_index("connection reset by peer"));
            }
        }

        let mut results = Vec::with_capacity(operations.len());
        for operation in operations {
            let rejected = self
                .state
                .lock()
                .unwrap()
                .rejected_ids
                .contains(operation.id());
            if rejected {
                results.push(BatchOperationResult {
                    id: operation.id().to_string(),
                    success: false,
                    error: Some(SearchIndexError::engine(400, "mapper_parsing_exception")),
                });
                continue;
            }
            let outcome = match operation {
                BulkOperation::Index { id, document } => {
                    self.seed(index, doc_type, id, document.clone());
                    Ok(())
                }
                BulkOperation::Delete { id } => self.delete_document(index, doc_type, id).await,
            };
            results.push(BatchOperationResult {
                id: operation.id().to_string(),
                success: outcome.is_ok(),
                error: outcome.err(),
            });
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        Ok(BatchOperationSummary {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        })
    }

    async fn create_index(
        &self,
        index: &str,
        body: Option<&Value>,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        if state.indices.contains_key(index) {
            return Err(SearchIndexError::engine(
                400,
                format!("resource_already_exists_exception: index [{}] already exists", index),
            ));
        }
        state.indices.insert(
            index.to_string(),
            StoredIndex {
                body: body.cloned(),
                ..StoredIndex::default()
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError> {
        match self.state.lock().unwrap().indices.remove(index) {
            Some(_) => Ok(()),
            None => Err(not_found("index")),
        }
    }

    async fn refresh_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        let targets = Self::resolve(&state, index);
        if targets.is_empty() {
            return Err(not_found("index"));
        }
        for name in targets {
            if let Some(stored) = state.indices.get_mut(&name) {
                stored.refreshes += 1;
            }
        }
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &Value,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        match state.indices.get_mut(index) {
            Some(stored) => {
                stored.mappings.insert(doc_type.to_string(), mapping.clone());
                Ok(())
            }
            None => Err(not_found("index")),
        }
    }

    async fn delete_by_query(
        &self,
        index: &str,
        doc_type: &str,
        query: &Value,
    ) -> Result<u64, SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        let targets = Self::resolve(&state, index);
        if targets.is_empty() {
            return Err(not_found("index"));
        }
        let mut deleted = 0;
        for name in targets {
            if let Some(stored) = state.indices.get_mut(&name) {
                let before = stored.documents.len();
                stored
                    .documents
                    .retain(|d| !(d.doc_type == doc_type && matches_query(query, d)));
                deleted += (before - stored.documents.len()) as u64;
            }
        }
        Ok(deleted)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        for action in actions {
            let index = match action {
                AliasAction::Add { index, .. } | AliasAction::Remove { index, .. } => index,
            };
            if !state.indices.contains_key(index) {
                return Err(not_found("index"));
            }
        }
        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    if let Some(stored) = state.indices.get_mut(index) {
                        stored.aliases.insert(alias.clone());
                    }
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(stored) = state.indices.get_mut(index) {
                        stored.aliases.remove(alias);
                    }
                }
            }
        }
        Ok(())
    }

    async fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>, SearchIndexError> {
        Ok(self.aliased_indices(alias))
    }

    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>, SearchIndexError> {
        let prefix = pattern.trim_end_matches('*');
        let exact = !pattern.ends_with('*');
        Ok(self
            .index_names()
            .into_iter()
            .filter(|name| if exact { name == pattern } else { name.starts_with(prefix) })
            .collect())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(self.state.lock().unwrap().healthy)
    }
}

// ---------------------------------------------------------------------------
// Store

/// Record store double. Removing a record does not touch the index, which
/// is how stale documents appear.
#[derive(Default)]
pub struct InMemoryStore {
    posts: Mutex<BTreeMap<u64, Post>>,
    lookups: Mutex<Vec<Vec<RecordId>>>,
}

impl InMemoryStore {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let store = Self::default();
        for post in posts {
            store.insert(post);
        }
        store
    }

    pub fn insert(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id, post);
    }

    pub fn remove(&self, id: u64) -> Option<Post> {
        self.posts.lock().unwrap().remove(&id)
    }

    pub fn all(&self) -> Vec<Post> {
        self.posts.lock().unwrap().values().cloned().collect()
    }

    /// Id lists passed to `find_by_ids`, in call order.
    pub fn lookups(&self) -> Vec<Vec<RecordId>> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore<Post> for InMemoryStore {
    async fn find_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Post>, SearchSyncError> {
        self.lookups.lock().unwrap().push(ids.to_vec());
        let posts = self.posts.lock().unwrap();
        // Reverse id order, so callers cannot rely on the store's ordering.
        let mut found: Vec<Post> = ids
            .iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .filter_map(|id| posts.get(&id).cloned())
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(found)
    }

    async fn find_batch(
        &self,
        scope: &Scope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, SearchSyncError> {
        let posts = self.posts.lock().unwrap();
        let scoped: Vec<Post> = match scope {
            Scope::All => posts.values().cloned().collect(),
            Scope::Named(name) if name == "published" => {
                posts.values().filter(|p| p.published).cloned().collect()
            }
            Scope::Named(name) => {
                return Err(SearchSyncError::store(format!("unknown scope '{}'", name)))
            }
        };
        Ok(scoped.into_iter().skip(offset).take(limit).collect())
    }
}

// ---------------------------------------------------------------------------
// Queue

/// Queue double that records every task.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<(IndexTask, String)>>,
    failing: Mutex<bool>,
}

impl RecordingQueue {
    pub fn tasks(&self) -> Vec<IndexTask> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|(task, _)| task.clone())
            .collect()
    }

    pub fn lanes(&self) -> Vec<String> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, lane)| lane.clone())
            .collect()
    }

    /// Ids of queued delete tasks, sorted.
    pub fn deleted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tasks()
            .into_iter()
            .filter(|task| task.is_delete())
            .map(|task| task.action.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, task: IndexTask, lane: &str) -> Result<(), SearchSyncError> {
        if *self.failing.lock().unwrap() {
            return Err(SearchSyncError::queue("broker unavailable"));
        }
        self.tasks.lock().unwrap().push((task, lane.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture

/// Shared collaborators for one test.
pub struct Fixture {
    pub engine: Arc<InMemoryEngine>,
    pub store: Arc<InMemoryStore>,
    pub queue: Arc<RecordingQueue>,
    pub runtime: RuntimeContext,
}

impl Fixture {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            engine: Arc::new(InMemoryEngine::new()),
            store: Arc::new(InMemoryStore::with_posts(posts)),
            queue: Arc::new(RecordingQueue::default()),
            runtime: RuntimeContext::default(),
        }
    }

    /// Index every stored post directly into the engine.
    pub fn index_all(&self) {
        for post in self.store.all() {
            self.engine.seed(
                INDEX,
                DOC_TYPE,
                &post.id.to_string(),
                serde_json::to_value(&post).unwrap(),
            );
        }
    }
}

/// `count` published posts with ids `1..=count` titled "post N".
pub fn numbered_posts(count: u64) -> Vec<Post> {
    (1..=count)
        .map(|id| Post::new(id, &format!("post {}", id)))
        .collect()
}
