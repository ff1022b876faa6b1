//! Record list extras: notes and file uploads.

use tracing::info;

use super::ListCache;
use crate::blob::BlobStore;
use crate::document::Timestamp;
use crate::models::{Entity, Record};
use crate::repository::RecordUpload;

impl ListCache<Record> {
    /// Create a free-text note, then reload the list.
    pub fn create_note(&mut self, mut note: Record) -> Option<Record> {
        let owner = self.require_owner()?;
        note.stamp_created(Timestamp::now());

        match self.repo.create(&owner, &note) {
            Ok(saved) => {
                info!(owner = %owner, "note created");
                self.load();
                Some(saved)
            }
            Err(e) => {
                self.fail("create_note", e);
                None
            }
        }
    }

    /// Upload a file and insert the record that points at it.
    pub fn upload(&mut self, blobs: &dyn BlobStore, upload: RecordUpload) -> Option<Record> {
        let owner = self.require_owner()?;

        match self.repo.upload_and_create(blobs, &owner, upload) {
            Ok(saved) => {
                self.insert_sorted(saved.clone());
                Some(saved)
            }
            Err(e) => {
                self.fail("upload", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::blob::DirBlobStore;
    use crate::models::RecordKind;
    use crate::store::{DocumentStore, SqliteStore};
    use std::sync::Arc;

    fn cache() -> ListCache<Record> {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        ListCache::new(store, Arc::new(Session::signed_in("u1")))
    }

    #[test]
    fn test_note_then_upload_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = DirBlobStore::new(dir.path());
        let mut records = cache();

        let note = Record::note(
            "u1".into(),
            "Allergies".into(),
            "Penicillin".into(),
            Timestamp::from_micros(100),
        );
        records.create_note(note).unwrap();

        let mut upload = RecordUpload::new(b"scan".to_vec(), "xray.png");
        upload.date_of_service = Timestamp::from_micros(200);
        records.upload(&blobs, upload).unwrap();

        let kinds: Vec<_> = records.items().iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec![RecordKind::Document, RecordKind::Note]);
    }

    #[test]
    fn test_failed_upload_sets_error() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = DirBlobStore::new(dir.path());
        let mut records = cache();

        assert!(records.upload(&blobs, RecordUpload::new(Vec::new(), "a.pdf")).is_none());
        assert_eq!(records.error(), Some("Cannot upload an empty file"));
        assert!(records.items().is_empty());
    }
}
