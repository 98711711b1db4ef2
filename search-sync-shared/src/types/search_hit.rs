//! Search hit types.
//!
//! Hits are produced per query and never persisted. A `HitRecord` pairs an
//! authoritative record with the hit that referenced it.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single match returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document id, equal to the record id in string form.
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    /// Relevance score. Absent when results are sorted by a field.
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    /// Stored fields returned with the hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,

    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl SearchHit {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index: None,
            doc_type: None,
            score: None,
            fields: None,
            source: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// Hits and total count of one engine query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResponse {
    /// Hits in engine order.
    pub hits: Vec<SearchHit>,

    /// Engine match count. May overcount relative to the record store.
    pub total: u64,

    pub took_ms: u64,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(hits: Vec<SearchHit>, total: u64, took_ms: u64) -> Self {
        Self {
            hits,
            total,
            took_ms,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.id.clone()).collect()
    }
}

/// A record returned by a search, with the hit that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord<R> {
    record: R,
    hit: SearchHit,
}

impl<R> HitRecord<R> {
    pub fn new(record: R, hit: SearchHit) -> Self {
        Self { record, hit }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn hit(&self) -> &SearchHit {
        &self.hit
    }

    pub fn score(&self) -> Option<f64> {
        self.hit.score
    }

    pub fn into_record(self) -> R {
        self.record
    }

    pub fn into_parts(self) -> (R, SearchHit) {
        (self.record, self.hit)
    }
}

impl<R> Deref for HitRecord<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.record
    }
}
