//! Doctor contact models.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::document::{
    DecodeResult, Document, DocumentBuilder, Fields, Timestamp, OWNER_FIELD,
};

/// A doctor in the user's address book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Option<String>,
    pub owner_id: String,
    pub full_name: String,
    /// e.g. "Cardiologist"
    pub specialty: String,
    /// Clinic or hospital
    pub clinic_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl Doctor {
    pub fn new(owner_id: String, full_name: String, specialty: String) -> Self {
        Self {
            id: None,
            owner_id,
            full_name,
            specialty,
            clinic_name: None,
            phone: None,
            email: None,
            address: None,
            created_at: Timestamp::now(),
            updated_at: None,
        }
    }
}

impl Entity for Doctor {
    const COLLECTION: &'static str = "doctors";
    const ORDER_BY: &'static str = "fullName";

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
        self.updated_at = Some(now);
    }

    fn decode(id: &str, doc: &Document) -> DecodeResult<Self> {
        let f = Fields::new(doc);
        Ok(Self {
            id: Some(id.to_string()),
            owner_id: f.string(OWNER_FIELD)?,
            full_name: f.string("fullName")?,
            specialty: f.string("specialty")?,
            clinic_name: f.opt_string("clinicName")?,
            phone: f.opt_string("phone")?,
            email: f.opt_string("email")?,
            address: f.opt_string("address")?,
            created_at: f.timestamp("createdAt")?,
            updated_at: f.opt_timestamp("updatedAt")?,
        })
    }

    fn encode(&self) -> Document {
        DocumentBuilder::new()
            .set(OWNER_FIELD, self.owner_id.as_str())
            .set("fullName", self.full_name.as_str())
            .set("specialty", self.specialty.as_str())
            .set_opt("clinicName", self.clinic_name.as_deref())
            .set_opt("phone", self.phone.as_deref())
            .set_opt("email", self.email.as_deref())
            .set_opt("address", self.address.as_deref())
            .set("createdAt", self.created_at)
            .set_opt("updatedAt", self.updated_at)
            .build()
    }

    // Alphabetical regardless of case.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.full_name
            .to_lowercase()
            .cmp(&other.full_name.to_lowercase())
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.full_name.as_str(), self.specialty.as_str()];
        fields.extend(self.clinic_name.as_deref());
        fields
    }
}
