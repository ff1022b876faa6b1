//! Domain models for the personal medical record.

mod appointment;
mod doctor;
mod medication;
mod record;

pub use appointment::*;
pub use doctor::*;
pub use medication::*;
pub use record::*;

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::document::{DecodeResult, Document, Timestamp};

/// An owner-scoped record stored in one document collection.
///
/// Implementors declare the collection, the ordering used by list caches and
/// the fields a free-text query searches.
pub trait Entity: Clone + Debug + Send + 'static {
    /// Collection holding documents of this kind.
    const COLLECTION: &'static str;
    /// Field that ordered queries sort on.
    const ORDER_BY: &'static str;
    /// Whether ordered queries sort descending.
    const DESCENDING: bool = false;

    /// Store-assigned identifier, `None` for an unsaved draft.
    fn id(&self) -> Option<&str>;

    /// Attach the identifier assigned on first write.
    fn set_id(&mut self, id: String);

    fn owner_id(&self) -> &str;

    /// Stamp creation and update times before the first write.
    fn stamp_created(&mut self, now: Timestamp);

    /// Build the entity from a stored document.
    fn decode(id: &str, doc: &Document) -> DecodeResult<Self>;

    /// Full field map for a create; absent optional fields are omitted.
    fn encode(&self) -> Document;

    /// Ordering of the in-memory list. Must agree with `ORDER_BY`/`DESCENDING`.
    fn sort_cmp(&self, other: &Self) -> Ordering;

    /// Text fields a query is matched against.
    fn search_fields(&self) -> Vec<&str>;

    /// Case-insensitive substring match against any searchable field.
    fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
