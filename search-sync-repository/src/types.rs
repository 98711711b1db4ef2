//! Request and response types for search engine operations.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::SearchIndexError;

/// Response to a single document write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDocumentResponse {
    /// Names of percolator queries the document matched. Empty unless
    /// percolation was requested.
    pub matches: Vec<String>,
}

impl IndexDocumentResponse {
    pub fn new(matches: Vec<String>) -> Self {
        Self { matches }
    }

    /// Read the `matches` list from a write response.
    ///
    /// Entries are either plain names or `{"_id": name, ...}` objects.
    pub fn from_body(body: &Value) -> Self {
        Self {
            matches: parse_matches(body),
        }
    }
}

/// Extract percolator match names from a response body.
pub fn parse_matches(body: &Value) -> Vec<String> {
    body.get("matches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| match m {
                    Value::String(name) => Some(name.clone()),
                    Value::Object(obj) => obj.get("_id").and_then(Value::as_str).map(String::from),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Write `document` under `id`, replacing any existing document.
    Index { id: String, document: Value },
    /// Remove the document stored under `id`.
    Delete { id: String },
}

impl BulkOperation {
    pub fn index(id: impl Into<String>, document: Value) -> Self {
        Self::Index {
            id: id.into(),
            document,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Index { id, .. } | Self::Delete { id } => id,
        }
    }

    /// Newline-delimited lines for this operation: action metadata followed
    /// by the document for index actions.
    pub fn to_lines(&self, index: &str, doc_type: &str) -> Vec<Value> {
        match self {
            Self::Index { id, document } => vec![
                json!({ "index": { "_index": index, "_type": doc_type, "_id": id } }),
                document.clone(),
            ],
            Self::Delete { id } => {
                vec![json!({ "delete": { "_index": index, "_type": doc_type, "_id": id } })]
            }
        }
    }
}

/// Result of a single operation within a batch.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// Document id the operation targeted.
    pub id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error details if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of operations attempted.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each operation.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Summary of an empty batch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Summarize the `items` array of a bulk response.
    pub fn from_bulk_response(body: &Value) -> Self {
        let results: Vec<BatchOperationResult> = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object()?.values().next())
                    .map(|outcome| {
                        let id = outcome
                            .get("_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let status = outcome
                            .get("status")
                            .and_then(Value::as_u64)
                            .unwrap_or(200) as u16;
                        let error = outcome
                            .get("error")
                            .map(|_| SearchIndexError::from_response(status, outcome));
                        BatchOperationResult {
                            id,
                            success: error.is_none(),
                            error,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// One entry of an atomic alias update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Add {
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }
}
