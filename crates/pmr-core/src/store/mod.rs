//! Remote document store seam.
//!
//! The application talks to its document database only through
//! [`DocumentStore`]. [`SqliteStore`] is the local implementation.

mod sqlite;

pub use sqlite::*;

use thiserror::Error;

use crate::db::DbError;
use crate::document::Document;

/// Document store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Unavailable(format!("Lock poisoned: {}", e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Equality filter on the owner plus a single-field ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerQuery {
    pub owner_id: String,
    pub order_by: String,
    pub descending: bool,
}

impl OwnerQuery {
    pub fn new(owner_id: impl Into<String>, order_by: impl Into<String>, descending: bool) -> Self {
        Self {
            owner_id: owner_id.into(),
            order_by: order_by.into(),
            descending,
        }
    }
}

/// Operations the application issues against a document collection.
pub trait DocumentStore: Send + Sync {
    /// Create a document; the store assigns and returns its id.
    fn add(&self, collection: &str, doc: Document) -> StoreResult<String>;

    /// Write a full document at a known id.
    fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Update only the fields named in `patch`.
    fn merge(&self, collection: &str, id: &str, patch: Document) -> StoreResult<()>;

    /// Delete a document. Deleting a missing document succeeds.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Documents owned by `query.owner_id`, ordered by `query.order_by`.
    /// Documents lacking the order field are excluded.
    fn query(&self, collection: &str, query: &OwnerQuery) -> StoreResult<Vec<(String, Document)>>;
}
