//! Record uploads: blob first, then the record document pointing at it.

use tracing::info;

use super::{RepoError, RepoResult, Repository};
use crate::blob::{extension_of, mime_type_for, object_path, BlobStore};
use crate::document::Timestamp;
use crate::models::{Entity, Record, DEFAULT_UPLOAD_CATEGORY, SELF_PROVIDER};

/// A file the user picked, scanned or photographed.
#[derive(Debug, Clone)]
pub struct RecordUpload {
    pub bytes: Vec<u8>,
    /// Picked file name; supplies the extension and the fallback title
    pub file_name: String,
    pub title: Option<String>,
    pub provider: String,
    pub category: String,
    pub date_of_service: Timestamp,
}

impl RecordUpload {
    /// Upload with the default provider and category, dated now.
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            title: None,
            provider: SELF_PROVIDER.to_string(),
            category: DEFAULT_UPLOAD_CATEGORY.to_string(),
            date_of_service: Timestamp::now(),
        }
    }

    fn resolved_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => self.file_name.clone(),
        }
    }
}

impl Repository<Record> {
    /// Store the file, then create a record whose `file_url` resolves to it.
    pub fn upload_and_create(
        &self,
        blobs: &dyn BlobStore,
        owner_id: &str,
        upload: RecordUpload,
    ) -> RepoResult<Record> {
        if upload.bytes.is_empty() {
            return Err(RepoError::EmptyFile);
        }

        let ext = extension_of(&upload.file_name);
        let path = object_path(owner_id, &ext);
        let url = blobs.put(&path, &upload.bytes, mime_type_for(&ext))?;

        let mut record = Record::document(
            owner_id.to_string(),
            upload.resolved_title(),
            url,
            upload.date_of_service,
        );
        record.provider = upload.provider;
        record.category = upload.category;
        record.stamp_created(Timestamp::now());

        let saved = self.create(owner_id, &record)?;
        info!(owner = owner_id, path = %path, "record uploaded");
        Ok(saved)
    }
}
