//! SQLite schema definition.

/// Complete database schema for the local document store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Documents
-- ============================================================================

-- One row per document; `body` holds the JSON field map.
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    owner_id TEXT,                               -- copy of body.userId for scoped queries
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, owner_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_primary_key_scoped_by_collection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES ('doctors', 'x', '{}')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES ('records', 'x', '{}')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES ('doctors', 'x', '{}')",
            [],
        );
        assert!(dup.is_err());
    }
}
