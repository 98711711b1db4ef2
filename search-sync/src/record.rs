//! The record contract.

/// Identifier of a record, in the string form used as the document id.
pub type RecordId = String;

/// A domain record owned by the authoritative store.
///
/// The search layer never owns records; it reacts to their lifecycle and
/// looks them up by id.
pub trait Record: Send + Sync + 'static {
    /// Stable identifier. Also the id of the record's index document.
    fn record_id(&self) -> RecordId;

    /// Boolean method of this record type registered under `name`, for use
    /// as an `if`/`unless` indexing condition.
    fn named_predicate(_name: &str) -> Option<fn(&Self) -> bool>
    where
        Self: Sized,
    {
        None
    }
}
