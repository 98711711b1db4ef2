//! Observers fired after a document is written.

use std::collections::HashMap;
use std::sync::Arc;

use crate::record::RecordId;
use crate::synchronizer::Lifecycle;

/// Result of one index write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    pub id: RecordId,
    pub lifecycle: Lifecycle,
    /// Percolator queries the document matched. Empty when percolation is
    /// disabled.
    pub matches: Vec<String>,
}

/// Point in the write at which callbacks fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackEvent {
    AfterIndex,
    AfterIndexOnCreate,
    AfterIndexOnUpdate,
    AfterPercolate,
}

impl CallbackEvent {
    /// The lifecycle-specific event for `lifecycle`.
    pub fn on(lifecycle: Lifecycle) -> Self {
        match lifecycle {
            Lifecycle::Create => Self::AfterIndexOnCreate,
            Lifecycle::Update => Self::AfterIndexOnUpdate,
        }
    }
}

pub type Callback<R> = Arc<dyn Fn(&R, &IndexOutcome) + Send + Sync>;

/// Ordered observer lists, one per event.
pub struct Callbacks<R> {
    registered: HashMap<CallbackEvent, Vec<Callback<R>>>,
}

impl<R> Default for Callbacks<R> {
    fn default() -> Self {
        Self {
            registered: HashMap::new(),
        }
    }
}

impl<R> Callbacks<R> {
    pub fn register(&mut self, event: CallbackEvent, callback: Callback<R>) {
        self.registered.entry(event).or_default().push(callback);
    }

    pub fn count(&self, event: CallbackEvent) -> usize {
        self.registered.get(&event).map_or(0, Vec::len)
    }

    /// Invoke the callbacks of `event` in registration order.
    pub fn fire(&self, event: CallbackEvent, record: &R, outcome: &IndexOutcome) {
        if let Some(callbacks) = self.registered.get(&event) {
            for callback in callbacks {
                callback(record, outcome);
            }
        }
    }

    /// Fire everything a completed write triggers: `AfterIndex`, then the
    /// lifecycle-specific event, then `AfterPercolate` if anything matched.
    pub fn fire_after_write(&self, record: &R, outcome: &IndexOutcome) {
        self.fire(CallbackEvent::AfterIndex, record, outcome);
        self.fire(CallbackEvent::on(outcome.lifecycle), record, outcome);
        if !outcome.matches.is_empty() {
            self.fire(CallbackEvent::AfterPercolate, record, outcome);
        }
    }
}
