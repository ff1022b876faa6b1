//! Medication models.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::document::{
    DecodeResult, Document, DocumentBuilder, Fields, Timestamp, OWNER_FIELD,
};

/// A medication course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: Option<String>,
    pub owner_id: String,
    pub name: String,
    /// e.g. "500 mg"
    pub strength: Option<String>,
    /// e.g. "tablet", "syrup"
    pub form: Option<String>,
    /// e.g. "oral"
    pub route: Option<String>,
    /// e.g. "1-0-1"
    pub frequency: Option<String>,
    /// Free-text dosage directions
    pub instructions: Option<String>,
    pub start_date: Timestamp,
    /// None while still being taken
    pub end_date: Option<Timestamp>,
    pub prescribed_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Medication {
    pub fn new(owner_id: String, name: String, start_date: Timestamp) -> Self {
        let now = Timestamp::now();
        Self {
            id: None,
            owner_id,
            name,
            strength: None,
            form: None,
            route: None,
            frequency: None,
            instructions: None,
            start_date,
            end_date: None,
            prescribed_by: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the course is still running at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.end_date.map_or(true, |end| end >= now)
    }
}

impl Entity for Medication {
    const COLLECTION: &'static str = "medications";
    const ORDER_BY: &'static str = "startDate";

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
            name: f.string("name")?,
            strength: f.opt_string("strength")?,
            form: f.opt_string("form")?,
            route: f.opt_string("route")?,
            frequency: f.opt_string("frequency")?,
            instructions: f.opt_string("instructions")?,
            start_date: f.timestamp("startDate")?,
            end_date: f.opt_timestamp("endDate")?,
            prescribed_by: f.opt_string("prescribedBy")?,
            notes: f.opt_string("notes")?,
            created_at: f.timestamp("createdAt")?,
            updated_at: f.timestamp("updatedAt")?,
        })
    }

    fn encode(&self) -> Document {
        DocumentBuilder::new()
            .set(OWNER_FIELD, self.owner_id.as_str())
            .set("name", self.name.as_str())
            .set_opt("strength", self.strength.as_deref())
            .set_opt("form", self.form.as_deref())
            .set_opt("route", self.route.as_deref())
            .set_opt("frequency", self.frequency.as_deref())
            .set_opt("instructions", self.instructions.as_deref())
            .set("startDate", self.start_date)
            .set_opt("endDate", self.end_date)
            .set_opt("prescribedBy", self.prescribed_by.as_deref())
            .set_opt("notes", self.notes.as_deref())
            .set("createdAt", self.created_at)
            .set("updatedAt", self.updated_at)
            .build()
    }

    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.start_date.cmp(&other.start_date)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.prescribed_by.as_deref());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_without_end_date() {
        let med = Medication::new("u".into(), "Metformin".into(), Timestamp::from_micros(0));
        assert!(med.is_active_at(Timestamp::now()));
    }

    #[test]
    fn test_inactive_after_end_date() {
        let mut med = Medication::new("u".into(), "Amoxicillin".into(), Timestamp::from_micros(0));
        med.end_date = Some(Timestamp::from_micros(100));
        assert!(med.is_active_at(Timestamp::from_micros(100)));
        assert!(!med.is_active_at(Timestamp::from_micros(101)));
    }

    #[test]
    fn test_search_includes_prescriber() {
        let mut med = Medication::new("u".into(), "Metformin".into(), Timestamp::from_micros(0));
        med.prescribed_by = Some("Dr. Okafor".into());
        assert!(med.matches_query("okafor"));
        assert!(med.matches_query("FORM"));
    }

    #[test]
    fn test_decode_rejects_string_start_date() {
        let mut doc = Medication::new("u".into(), "Metformin".into(), Timestamp::from_micros(0)).encode();
        doc.insert("startDate".into(), "2025-01-01".into());
        assert!(Medication::decode("m1", &doc).is_err());
    }
}
