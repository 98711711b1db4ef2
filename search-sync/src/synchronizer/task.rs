//! Index tasks carried by the task queue.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// Record lifecycle event that triggered an index write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Create,
    Update,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// What a task does to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum IndexAction {
    /// Reload the record and write its document.
    Index { id: RecordId, lifecycle: Lifecycle },
    /// Remove the document.
    Delete { id: RecordId },
}

impl IndexAction {
    pub fn id(&self) -> &str {
        match self {
            Self::Index { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// A unit of work for the task queue.
///
/// `kind` names the record kind (`index/type`) so a worker can route the task
/// to the synchronizer that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTask {
    pub kind: String,
    #[serde(flatten)]
    pub action: IndexAction,
}

impl IndexTask {
    pub fn index(kind: impl Into<String>, id: impl Into<RecordId>, lifecycle: Lifecycle) -> Self {
        Self {
            kind: kind.into(),
            action: IndexAction::Index {
                id: id.into(),
                lifecycle,
            },
        }
    }

    pub fn delete(kind: impl Into<String>, id: impl Into<RecordId>) -> Self {
        Self {
            kind: kind.into(),
            action: IndexAction::Delete { id: id.into() },
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.action, IndexAction::Delete { .. })
    }
}
