//! Document table operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::document::{Document, Value, OWNER_FIELD};

/// A document row as read back from the table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub doc_id: String,
    pub owner_id: Option<String>,
    pub fields: Document,
}

/// Owner column value derived from the body.
fn owner_of(fields: &Document) -> Option<&str> {
    match fields.get(OWNER_FIELD) {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

impl Database {
    /// Insert a new document. Fails if the id is taken within the collection.
    pub fn insert_document(&self, collection: &str, doc_id: &str, fields: &Document) -> DbResult<()> {
        let body = serde_json::to_string(fields)?;
        self.conn.execute(
            r#"
            INSERT INTO documents (collection, doc_id, owner_id, body)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![collection, doc_id, owner_of(fields), body],
        )?;
        Ok(())
    }

    /// Write a document at a known id, replacing any existing body.
    pub fn put_document(&self, collection: &str, doc_id: &str, fields: &Document) -> DbResult<()> {
        let body = serde_json::to_string(fields)?;
        self.conn.execute(
            r#"
            INSERT INTO documents (collection, doc_id, owner_id, body)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, doc_id) DO UPDATE SET
                owner_id = excluded.owner_id,
                body = excluded.body,
                updated_at = datetime('now')
            "#,
            params![collection, doc_id, owner_of(fields), body],
        )?;
        Ok(())
    }

    /// Get a document by id.
    pub fn get_document(&self, collection: &str, doc_id: &str) -> DbResult<Option<StoredDocument>> {
        self.conn
            .query_row(
                r#"
                SELECT doc_id, owner_id, body
                FROM documents
                WHERE collection = ?1 AND doc_id = ?2
                "#,
                params![collection, doc_id],
                |row| {
                    Ok(DocumentRow {
                        doc_id: row.get(0)?,
                        owner_id: row.get(1)?,
                        body: row.get(2)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List every document in a collection owned by `owner_id`.
    ///
    /// Rows come back in insertion order; callers apply their own ordering.
    pub fn list_documents_for_owner(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> DbResult<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT doc_id, owner_id, body
            FROM documents
            WHERE collection = ?1 AND owner_id = ?2
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map(params![collection, owner_id], |row| {
            Ok(DocumentRow {
                doc_id: row.get(0)?,
                owner_id: row.get(1)?,
                body: row.get(2)?,
            })
        })?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?.try_into()?);
        }
        Ok(docs)
    }

    /// Merge `patch` into an existing document. Only the named fields change.
    pub fn merge_document(&mut self, collection: &str, doc_id: &str, patch: &Document) -> DbResult<()> {
        let tx = self.conn.transaction()?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
                |row| row.get(0),
            )
            .optional()?;
        let body = body.ok_or_else(|| DbError::NotFound(format!("{}/{}", collection, doc_id)))?;

        let mut fields: Document = serde_json::from_str(&body)?;
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        let merged = serde_json::to_string(&fields)?;

        tx.execute(
            r#"
            UPDATE documents SET
                owner_id = ?3,
                body = ?4,
                updated_at = datetime('now')
            WHERE collection = ?1 AND doc_id = ?2
            "#,
            params![collection, doc_id, owner_of(&fields), merged],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a document. Returns whether a row was removed.
    pub fn delete_document(&self, collection: &str, doc_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
            params![collection, doc_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct DocumentRow {
    doc_id: String,
    owner_id: Option<String>,
    body: String,
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let fields: Document = serde_json::from_str(&row.body)?;
        Ok(StoredDocument {
            doc_id: row.doc_id,
            owner_id: row.owner_id,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentBuilder, Timestamp};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_doc(owner: &str, title: &str) -> Document {
        DocumentBuilder::new()
            .set(OWNER_FIELD, owner)
            .set("title", title)
            .set("startAt", Timestamp::from_micros(10))
            .build()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        db.insert_document("appointments", "a1", &make_doc("u1", "Dentist"))
            .unwrap();

        let stored = db.get_document("appointments", "a1").unwrap().unwrap();
        assert_eq!(stored.owner_id.as_deref(), Some("u1"));
        assert_eq!(stored.fields.get("title"), Some(&Value::from("Dentist")));
        assert_eq!(
            stored.fields.get("startAt"),
            Some(&Value::Timestamp(Timestamp::from_micros(10)))
        );
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let db = setup_db();
        db.insert_document("appointments", "a1", &make_doc("u1", "Dentist"))
            .unwrap();
        assert!(db
            .insert_document("appointments", "a1", &make_doc("u1", "Other"))
            .is_err());
    }

    #[test]
    fn test_list_for_owner() {
        let db = setup_db();
        db.insert_document("appointments", "a1", &make_doc("u1", "One")).unwrap();
        db.insert_document("appointments", "a2", &make_doc("u2", "Two")).unwrap();
        db.insert_document("appointments", "a3", &make_doc("u1", "Three")).unwrap();
        db.insert_document("doctors", "d1", &make_doc("u1", "Elsewhere")).unwrap();

        let docs = db.list_documents_for_owner("appointments", "u1").unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[test]
    fn test_merge_keeps_unnamed_fields() {
        let mut db = setup_db();
        let mut doc = make_doc("u1", "Old");
        doc.insert("provider".into(), "Dr. X".into());
        db.insert_document("appointments", "a1", &doc).unwrap();

        let patch = DocumentBuilder::new().set("title", "New").build();
        db.merge_document("appointments", "a1", &patch).unwrap();

        let stored = db.get_document("appointments", "a1").unwrap().unwrap();
        assert_eq!(stored.fields.get("title"), Some(&Value::from("New")));
        assert_eq!(stored.fields.get("provider"), Some(&Value::from("Dr. X")));
    }

    #[test]
    fn test_merge_missing_document() {
        let mut db = setup_db();
        let patch = DocumentBuilder::new().set("title", "New").build();
        let err = db.merge_document("appointments", "nope", &patch).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_put_replaces_body() {
        let db = setup_db();
        db.put_document("users", "u1", &make_doc("u1", "First")).unwrap();
        db.put_document("users", "u1", &make_doc("u1", "Second")).unwrap();

        let stored = db.get_document("users", "u1").unwrap().unwrap();
        assert_eq!(stored.fields.get("title"), Some(&Value::from("Second")));
    }

    #[test]
    fn test_delete() {
        let db = setup_db();
        db.insert_document("appointments", "a1", &make_doc("u1", "One")).unwrap();
        assert!(db.delete_document("appointments", "a1").unwrap());
        assert!(!db.delete_document("appointments", "a1").unwrap());
        assert!(db.get_document("appointments", "a1").unwrap().is_none());
    }
}
