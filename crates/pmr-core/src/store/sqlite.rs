//! SQLite-backed document store.

use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use super::{DocumentStore, OwnerQuery, StoreError, StoreResult};
use crate::db::{Database, DbError};
use crate::document::Document;

/// Document store over a local SQLite database.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }
}

impl DocumentStore for SqliteStore {
    fn add(&self, collection: &str, doc: Document) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.lock()?;
        db.insert_document(collection, &id, &doc)?;
        debug!(collection, id = %id, "document added");
        Ok(id)
    }

    fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let db = self.db.lock()?;
        db.put_document(collection, id, &doc)?;
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let db = self.db.lock()?;
        Ok(db.get_document(collection, id)?.map(|stored| stored.fields))
    }

    fn merge(&self, collection: &str, id: &str, patch: Document) -> StoreResult<()> {
        let mut db = self.db.lock()?;
        match db.merge_document(collection, id, &patch) {
            Err(DbError::NotFound(_)) => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            other => Ok(other?),
        }
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let db = self.db.lock()?;
        let removed = db.delete_document(collection, id)?;
        debug!(collection, id, removed, "document deleted");
        Ok(())
    }

    fn query(&self, collection: &str, query: &OwnerQuery) -> StoreResult<Vec<(String, Document)>> {
        let db = self.db.lock()?;
        let stored = db.list_documents_for_owner(collection, &query.owner_id)?;
        drop(db);

        let mut docs: Vec<(String, Document)> = stored
            .into_iter()
            .filter(|d| d.fields.get(&query.order_by).is_some_and(|v| !v.is_null()))
            .map(|d| (d.doc_id, d.fields))
            .collect();

        // Stable sort keeps insertion order among equal keys.
        docs.sort_by(|(_, a), (_, b)| {
            let ord = a[&query.order_by].query_cmp(&b[&query.order_by]);
            if query.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentBuilder, Timestamp, Value, OWNER_FIELD};

    fn doc(owner: &str, at: Option<i64>) -> Document {
        DocumentBuilder::new()
            .set(OWNER_FIELD, owner)
            .set_opt("startAt", at.map(Timestamp::from_micros))
            .build()
    }

    #[test]
    fn test_add_assigns_uuid() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.add("appointments", doc("u1", Some(1))).unwrap();
        assert_eq!(id.len(), 36);
        assert!(store.get("appointments", &id).unwrap().is_some());
    }

    #[test]
    fn test_query_orders_and_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        let late = store.add("appointments", doc("u1", Some(30))).unwrap();
        let early = store.add("appointments", doc("u1", Some(10))).unwrap();
        store.add("appointments", doc("u1", None)).unwrap();
        store.add("appointments", doc("u2", Some(20))).unwrap();

        let asc = store
            .query("appointments", &OwnerQuery::new("u1", "startAt", false))
            .unwrap();
        let ids: Vec<_> = asc.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec![early.clone(), late.clone()]);

        let desc = store
            .query("appointments", &OwnerQuery::new("u1", "startAt", true))
            .unwrap();
        let ids: Vec<_> = desc.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec![late, early]);
    }

    #[test]
    fn test_merge_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let patch = DocumentBuilder::new().set("title", "x").build();
        let err = store.merge("appointments", "missing", patch).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_merge_null_clears_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut d = doc("u1", Some(1));
        d.insert("location".into(), "Room 2".into());
        let id = store.add("appointments", d).unwrap();

        let patch = DocumentBuilder::new().set("location", Value::Null).build();
        store.merge("appointments", &id, patch).unwrap();

        let stored = store.get("appointments", &id).unwrap().unwrap();
        assert_eq!(stored.get("location"), Some(&Value::Null));
    }

    #[test]
    fn test_delete_missing_succeeds() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.delete("appointments", "missing").is_ok());
    }
}
