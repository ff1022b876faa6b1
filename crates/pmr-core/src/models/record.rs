//! Medical record models: free-text notes and uploaded documents.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::document::{
    DecodeResult, Document, DocumentBuilder, Fields, Timestamp, OWNER_FIELD,
};

/// Default provider for records the user creates themselves.
pub const SELF_PROVIDER: &str = "Self";
/// Category assigned to free-text notes.
pub const NOTE_CATEGORY: &str = "Note";
/// Category assigned to uploads when none is chosen.
pub const DEFAULT_UPLOAD_CATEGORY: &str = "Other";

/// What a record carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordKind {
    /// Free-text note
    Note,
    /// Uploaded file referenced by URL
    Document,
    /// Neither content nor file
    Other,
}

/// A note or document in the user's record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: Option<String>,
    pub owner_id: String,
    pub title: String,
    pub provider: String,
    pub category: String,
    pub date_of_service: Timestamp,
    /// Note body
    pub content: Option<String>,
    /// Retrieval URL of the uploaded file
    pub file_url: Option<String>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Record {
    /// Create an unsaved free-text note.
    pub fn note(owner_id: String, title: String, content: String, date_of_service: Timestamp) -> Self {
        Self {
            id: None,
            owner_id,
            title,
            provider: SELF_PROVIDER.to_string(),
            category: NOTE_CATEGORY.to_string(),
            date_of_service,
            content: Some(content),
            file_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Create an unsaved record pointing at an uploaded file.
    pub fn document(
        owner_id: String,
        title: String,
        file_url: String,
        date_of_service: Timestamp,
    ) -> Self {
        Self {
            id: None,
            owner_id,
            title,
            provider: SELF_PROVIDER.to_string(),
            category: DEFAULT_UPLOAD_CATEGORY.to_string(),
            date_of_service,
            content: None,
            file_url: Some(file_url),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match (&self.content, &self.file_url) {
            (Some(_), _) => RecordKind::Note,
            (None, Some(_)) => RecordKind::Document,
            (None, None) => RecordKind::Other,
        }
    }
}

impl Entity for Record {
    const COLLECTION: &'static str = "records";
    const ORDER_BY: &'static str = "dateOfService";
    const DESCENDING: bool = true;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn stamp_created(&mut self, now: Timestamp) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn decode(id: &str, doc: &Document) -> DecodeResult<Self> {
        let f = Fields::new(doc);
        Ok(Self {
            id: Some(id.to_string()),
            owner_id: f.string(OWNER_FIELD)?,
            title: f.string("title")?,
            provider: f.string("provider")?,
            category: f.string("category")?,
            date_of_service: f.timestamp("dateOfService")?,
            content: f.opt_string("content")?,
            file_url: f.opt_string("fileUrl")?,
            created_at: f.opt_timestamp("createdAt")?,
            updated_at: f.opt_timestamp("updatedAt")?,
        })
    }

    fn encode(&self) -> Document {
        DocumentBuilder::new()
            .set(OWNER_FIELD, self.owner_id.as_str())
            .set("title", self.title.as_str())
            .set("provider", self.provider.as_str())
            .set("category", self.category.as_str())
            .set("dateOfService", self.date_of_service)
            .set_opt("content", self.content.as_deref())
            .set_opt("fileUrl", self.file_url.as_deref())
            .set_opt("createdAt", self.created_at)
            .set_opt("updatedAt", self.updated_at)
            .build()
    }

    // Newest first.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        other.date_of_service.cmp(&self.date_of_service)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.title.as_str(),
            self.provider.as_str(),
            self.category.as_str(),
        ];
        fields.extend(self.content.as_deref());
        fields
    }
}
