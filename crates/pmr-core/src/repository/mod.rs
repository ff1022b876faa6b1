//! Owner-scoped repositories over the document store.
//!
//! Every read filters on the owner and every write checks that the caller owns
//! the document. No retries and no idempotency keys: a repeated create makes a
//! duplicate.

mod records;

pub use records::*;

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::blob::BlobError;
use crate::document::{DecodeError, Document, Value, OWNER_FIELD};
use crate::models::Entity;
use crate::store::{DocumentStore, OwnerQuery, StoreError};

/// Repository errors.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    #[error("Entity belongs to {found}, not the signed-in user {expected}")]
    OwnerMismatch { expected: String, found: String },

    #[error("Document {collection}/{id} is not owned by the signed-in user")]
    Forbidden { collection: String, id: String },

    #[error("The owner field cannot be changed")]
    OwnerPatch,

    #[error("Malformed document {id}: {source}")]
    Malformed {
        id: String,
        #[source]
        source: DecodeError,
    },

    #[error("Cannot upload an empty file")]
    EmptyFile,
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Gateway for one entity kind's collection.
pub struct Repository<E: Entity> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// All of the owner's entities in list order. Malformed documents are skipped.
    pub fn list(&self, owner_id: &str) -> RepoResult<Vec<E>> {
        let query = OwnerQuery::new(owner_id, E::ORDER_BY, E::DESCENDING);
        let docs = self.store.query(E::COLLECTION, &query)?;

        let mut items: Vec<E> = docs
            .iter()
            .filter_map(|(id, doc)| match E::decode(id, doc) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(collection = E::COLLECTION, id = %id, error = %e, "skipping malformed document");
                    None
                }
            })
            .collect();

        // The store orders on raw field values; align with the entity's ordering.
        items.sort_by(|a, b| a.sort_cmp(b));
        Ok(items)
    }

    /// A single entity, if it exists and belongs to the owner.
    pub fn get(&self, owner_id: &str, id: &str) -> RepoResult<Option<E>> {
        let Some(doc) = self.store.get(E::COLLECTION, id)? else {
            return Ok(None);
        };
        self.ensure_owned(owner_id, id, &doc)?;
        E::decode(id, &doc)
            .map(Some)
            .map_err(|source| RepoError::Malformed {
                id: id.to_string(),
                source,
            })
    }

    /// Write a new entity and return it with its assigned id.
    pub fn create(&self, owner_id: &str, entity: &E) -> RepoResult<E> {
        if entity.owner_id() != owner_id {
            return Err(RepoError::OwnerMismatch {
                expected: owner_id.to_string(),
                found: entity.owner_id().to_string(),
            });
        }
        let id = self.store.add(E::COLLECTION, entity.encode())?;
        let mut saved = entity.clone();
        saved.set_id(id);
        Ok(saved)
    }

    /// Merge the named fields into an existing entity.
    pub fn merge(&self, owner_id: &str, id: &str, patch: Document) -> RepoResult<()> {
        if patch.contains_key(OWNER_FIELD) {
            return Err(RepoError::OwnerPatch);
        }
        match self.store.get(E::COLLECTION, id)? {
            Some(doc) => self.ensure_owned(owner_id, id, &doc)?,
            None => {
                return Err(StoreError::NotFound {
                    collection: E::COLLECTION.to_string(),
                    id: id.to_string(),
                }
                .into())
            }
        }
        self.store.merge(E::COLLECTION, id, patch)?;
        Ok(())
    }

    /// Delete an entity. A missing document counts as deleted.
    pub fn delete(&self, owner_id: &str, id: &str) -> RepoResult<()> {
        if let Some(doc) = self.store.get(E::COLLECTION, id)? {
            self.ensure_owned(owner_id, id, &doc)?;
        }
        self.store.delete(E::COLLECTION, id)?;
        Ok(())
    }

    fn ensure_owned(&self, owner_id: &str, id: &str, doc: &Document) -> RepoResult<()> {
        match doc.get(OWNER_FIELD) {
            Some(Value::String(owner)) if owner == owner_id => Ok(()),
            _ => Err(RepoError::Forbidden {
                collection: E::COLLECTION.to_string(),
                id: id.to_string(),
            }),
        }
    }
}
