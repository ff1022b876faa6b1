//! Appointment models.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::document::{
    DecodeResult, Document, DocumentBuilder, Fields, Timestamp, OWNER_FIELD,
};

/// A scheduled visit, optionally with a reminder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Store-assigned ID - null until first write
    pub id: Option<String>,
    /// Owning user
    pub owner_id: String,
    pub title: String,
    /// Doctor or clinic seen
    pub provider: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub start_at: Timestamp,
    pub end_at: Option<Timestamp>,
    pub is_all_day: bool,
    /// Reminder lead time; no reminder when absent
    pub remind_minutes_before: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    /// Create an unsaved appointment with required fields.
    pub fn new(owner_id: String, title: String, start_at: Timestamp) -> Self {
        let now = Timestamp::now();
        Self {
            id: None,
            owner_id,
            title,
            provider: None,
            location: None,
            notes: None,
            start_at,
            end_at: None,
            is_all_day: false,
            remind_minutes_before: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the appointment starts at or after `now`.
    pub fn is_upcoming(&self, now: Timestamp) -> bool {
        self.start_at >= now
    }
}

impl Entity for Appointment {
    const COLLECTION: &'static str = "appointments";
    const ORDER_BY: &'static str = "startAt";

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
        self.created_at = now;
        self.updated_at = now;
    }

    fn decode(id: &str, doc: &Document) -> DecodeResult<Self> {
        let f = Fields::new(doc);
        Ok(Self {
            id: Some(id.to_string()),
            owner_id: f.string(OWNER_FIELD)?,
            title: f.string("title")?,
            provider: f.opt_string("provider")?,
            location: f.opt_string("location")?,
            notes: f.opt_string("notes")?,
            start_at: f.timestamp("startAt")?,
            end_at: f.opt_timestamp("endAt")?,
            is_all_day: f.bool("isAllDay")?,
            remind_minutes_before: f.opt_integer("remindMinutesBefore")?,
            created_at: f.timestamp("createdAt")?,
            updated_at: f.timestamp("updatedAt")?,
        })
    }

    fn encode(&self) -> Document {
        DocumentBuilder::new()
            .set(OWNER_FIELD, self.owner_id.as_str())
            .set("title", self.title.as_str())
            .set_opt("provider", self.provider.as_deref())
            .set_opt("location", self.location.as_deref())
            .set_opt("notes", self.notes.as_deref())
            .set("startAt", self.start_at)
            .set_opt("endAt", self.end_at)
            .set("isAllDay", self.is_all_day)
            .set_opt("remindMinutesBefore", self.remind_minutes_before)
            .set("createdAt", self.created_at)
            .set("updatedAt", self.updated_at)
            .build()
    }

    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.start_at.cmp(&other.start_at)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.provider.as_deref());
        fields
    }
}
