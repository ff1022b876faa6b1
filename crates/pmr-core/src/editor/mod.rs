//! Editor forms: stage user input, validate it, and say what to persist.
//!
//! A form never writes anything. [`Form::submit`] returns an [`EditOutcome`]
//! that the caller hands to its list cache.

use thiserror::Error;

use crate::document::{Document, DocumentBuilder, Timestamp, Value};
use crate::models::{Appointment, Doctor, Entity, Medication, Record, NOTE_CATEGORY, SELF_PROVIDER};

/// Reminder lead time offered for new appointments.
pub const DEFAULT_REMINDER_MINUTES: i64 = 60;

/// Why a form cannot be submitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} cannot be negative")]
    Negative(&'static str),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// What the caller should persist.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome<E> {
    /// A fully formed, unsaved entity
    Create(E),
    /// Fields to merge into an existing entity
    Update { id: String, patch: Document },
}

/// Staged input for one entity kind.
pub trait Form<E: Entity>: Sized {
    /// Pre-fill from a saved entity.
    fn from_existing(entity: &E) -> Self;

    fn validate(&self) -> ValidationResult<()>;

    /// The new entity this form describes.
    fn to_entity(&self, owner_id: &str) -> E;

    /// Every editable field; cleared optional fields are `Null`.
    fn to_patch(&self) -> Document;

    /// Validate, then create when `existing` is absent or unsaved, else update it.
    fn submit(&self, existing: Option<&E>, owner_id: &str) -> ValidationResult<EditOutcome<E>> {
        self.validate()?;
        Ok(match existing.and_then(|e| e.id()) {
            Some(id) => EditOutcome::Update {
                id: id.to_string(),
                patch: self.to_patch(),
            },
            None => EditOutcome::Create(self.to_entity(owner_id)),
        })
    }
}

fn required(value: &str, field: &'static str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

/// Blank input means "no value".
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn or_blank(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_value(value: &str) -> Value {
    optional(value).into()
}

/// Appointment editor.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentForm {
    pub title: String,
    pub provider: String,
    pub location: String,
    pub notes: String,
    pub start_at: Timestamp,
    pub end_at: Option<Timestamp>,
    pub is_all_day: bool,
    pub remind_minutes_before: Option<i64>,
}

impl AppointmentForm {
    /// Blank form starting now with the given reminder lead time.
    pub fn new(remind_minutes_before: Option<i64>) -> Self {
        Self {
            title: String::new(),
            provider: String::new(),
            location: String::new(),
            notes: String::new(),
            start_at: Timestamp::now(),
            end_at: None,
            is_all_day: false,
            remind_minutes_before,
        }
    }
}

impl Default for AppointmentForm {
    fn default() -> Self {
        Self::new(Some(DEFAULT_REMINDER_MINUTES))
    }
}

impl Form<Appointment> for AppointmentForm {
    fn from_existing(a: &Appointment) -> Self {
        Self {
            title: a.title.clone(),
            provider: or_blank(&a.provider),
            location: or_blank(&a.location),
            notes: or_blank(&a.notes),
            start_at: a.start_at,
            end_at: a.end_at,
            is_all_day: a.is_all_day,
            remind_minutes_before: a.remind_minutes_before,
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        required(&self.title, "Title")?;
        if matches!(self.remind_minutes_before, Some(m) if m < 0) {
            return Err(ValidationError::Negative("Reminder"));
        }
        Ok(())
    }

    fn to_entity(&self, owner_id: &str) -> Appointment {
        let mut appt = Appointment::new(owner_id.to_string(), self.title.trim().to_string(), self.start_at);
        appt.provider = optional(&self.provider);
        appt.location = optional(&self.location);
        appt.notes = optional(&self.notes);
        appt.end_at = self.end_at;
        appt.is_all_day = self.is_all_day;
        appt.remind_minutes_before = self.remind_minutes_before;
        appt
    }

    fn to_patch(&self) -> Document {
        DocumentBuilder::new()
            .set("title", self.title.trim())
            .set("provider", opt_value(&self.provider))
            .set("location", opt_value(&self.location))
            .set("notes", opt_value(&self.notes))
            .set("startAt", self.start_at)
            .set("endAt", self.end_at)
            .set("isAllDay", self.is_all_day)
            .set("remindMinutesBefore", self.remind_minutes_before)
            .build()
    }
}

/// Doctor editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorForm {
    pub full_name: String,
    pub specialty: String,
    pub clinic_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl Form<Doctor> for DoctorForm {
    fn from_existing(d: &Doctor) -> Self {
        Self {
            full_name: d.full_name.clone(),
            specialty: d.specialty.clone(),
            clinic_name: or_blank(&d.clinic_name),
            phone: or_blank(&d.phone),
            email: or_blank(&d.email),
            address: or_blank(&d.address),
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        required(&self.full_name, "Full name")?;
        required(&self.specialty, "Specialty")
    }

    fn to_entity(&self, owner_id: &str) -> Doctor {
        let mut doctor = Doctor::new(
            owner_id.to_string(),
            self.full_name.trim().to_string(),
            self.specialty.trim().to_string(),
        );
        doctor.clinic_name = optional(&self.clinic_name);
        doctor.phone = optional(&self.phone);
        doctor.email = optional(&self.email);
        doctor.address = optional(&self.address);
        doctor
    }

    fn to_patch(&self) -> Document {
        DocumentBuilder::new()
            .set("fullName", self.full_name.trim())
            .set("specialty", self.specialty.trim())
            .set("clinicName", opt_value(&self.clinic_name))
            .set("phone", opt_value(&self.phone))
            .set("email", opt_value(&self.email))
            .set("address", opt_value(&self.address))
            .build()
    }
}

/// Medication editor.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationForm {
    pub name: String,
    pub strength: String,
    pub form: String,
    pub route: String,
    pub frequency: String,
    pub instructions: String,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub prescribed_by: String,
    pub notes: String,
}

impl Default for MedicationForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            strength: String::new(),
            form: String::new(),
            route: String::new(),
            frequency: String::new(),
            instructions: String::new(),
            start_date: Timestamp::now(),
            end_date: None,
            prescribed_by: String::new(),
            notes: String::new(),
        }
    }
}

impl Form<Medication> for MedicationForm {
    fn from_existing(m: &Medication) -> Self {
        Self {
            name: m.name.clone(),
            strength: or_blank(&m.strength),
            form: or_blank(&m.form),
            route: or_blank(&m.route),
            frequency: or_blank(&m.frequency),
            instructions: or_blank(&m.instructions),
            start_date: m.start_date,
            end_date: m.end_date,
            prescribed_by: or_blank(&m.prescribed_by),
            notes: or_blank(&m.notes),
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        required(&self.name, "Name")
    }

    fn to_entity(&self, owner_id: &str) -> Medication {
        let mut med = Medication::new(owner_id.to_string(), self.name.trim().to_string(), self.start_date);
        med.strength = optional(&self.strength);
        med.form = optional(&self.form);
        med.route = optional(&self.route);
        med.frequency = optional(&self.frequency);
        med.instructions = optional(&self.instructions);
        med.end_date = self.end_date;
        med.prescribed_by = optional(&self.prescribed_by);
        med.notes = optional(&self.notes);
        med
    }

    fn to_patch(&self) -> Document {
        DocumentBuilder::new()
            .set("name", self.name.trim())
            .set("strength", opt_value(&self.strength))
            .set("form", opt_value(&self.form))
            .set("route", opt_value(&self.route))
            .set("frequency", opt_value(&self.frequency))
            .set("instructions", opt_value(&self.instructions))
            .set("startDate", self.start_date)
            .set("endDate", self.end_date)
            .set("prescribedBy", opt_value(&self.prescribed_by))
            .set("notes", opt_value(&self.notes))
            .build()
    }
}

/// Free-text note editor.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
    pub category: String,
    pub provider: String,
    pub date_of_service: Timestamp,
}

impl Default for NoteForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            category: NOTE_CATEGORY.to_string(),
            provider: SELF_PROVIDER.to_string(),
            date_of_service: Timestamp::now(),
        }
    }
}

impl NoteForm {
    fn category_or_default(&self) -> String {
        optional(&self.category).unwrap_or_else(|| NOTE_CATEGORY.to_string())
    }

    fn provider_or_default(&self) -> String {
        optional(&self.provider).unwrap_or_else(|| SELF_PROVIDER.to_string())
    }
}

impl Form<Record> for NoteForm {
    fn from_existing(r: &Record) -> Self {
        Self {
            title: r.title.clone(),
            content: or_blank(&r.content),
            category: r.category.clone(),
            provider: r.provider.clone(),
            date_of_service: r.date_of_service,
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        required(&self.title, "Title")?;
        required(&self.content, "Content")
    }

    fn to_entity(&self, owner_id: &str) -> Record {
        let mut note = Record::note(
            owner_id.to_string(),
            self.title.trim().to_string(),
            self.content.trim().to_string(),
            self.date_of_service,
        );
        note.category = self.category_or_default();
        note.provider = self.provider_or_default();
        note
    }

    fn to_patch(&self) -> Document {
        DocumentBuilder::new()
            .set("title", self.title.trim())
            .set("content", self.content.trim())
            .set("category", self.category_or_default())
            .set("provider", self.provider_or_default())
            .set("dateOfService", self.date_of_service)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::OWNER_FIELD;

    #[test]
    fn test_blank_title_rejected() {
        let form = AppointmentForm {
            title: "   ".into(),
            ..AppointmentForm::default()
        };
        assert_eq!(
            form.submit(None, "u1").unwrap_err(),
            ValidationError::Required("Title")
        );
    }

    #[test]
    fn test_create_trims_and_drops_blanks() {
        let form = AppointmentForm {
            title: "  Dentist ".into(),
            provider: " ".into(),
            location: "Main St".into(),
            ..AppointmentForm::default()
        };
        let EditOutcome::Create(appt) = form.submit(None, "u1").unwrap() else {
            panic!("expected create");
        };
        assert_eq!(appt.title, "Dentist");
        assert_eq!(appt.owner_id, "u1");
        assert_eq!(appt.provider, None);
        assert_eq!(appt.location.as_deref(), Some("Main St"));
        assert_eq!(appt.remind_minutes_before, Some(DEFAULT_REMINDER_MINUTES));
        assert!(appt.id.is_none());
    }

    #[test]
    fn test_update_patch_clears_and_omits_owner() {
        let mut existing = Appointment::new("u1".into(), "Dentist".into(), Timestamp::from_micros(9));
        existing.id = Some("a1".into());
        existing.provider = Some("Dr. X".into());

        let mut form = AppointmentForm::from_existing(&existing);
        assert_eq!(form.provider, "Dr. X");
        form.provider.clear();
        form.remind_minutes_before = None;

        let EditOutcome::Update { id, patch } = form.submit(Some(&existing), "u1").unwrap() else {
            panic!("expected update");
        };
        assert_eq!(id, "a1");
        assert_eq!(patch.get("provider"), Some(&Value::Null));
        assert_eq!(patch.get("remindMinutesBefore"), Some(&Value::Null));
        assert_eq!(patch.get("title"), Some(&Value::from("Dentist")));
        assert!(!patch.contains_key(OWNER_FIELD));
    }

    #[test]
    fn test_appointment_rejects_negative_reminder() {
        let form = AppointmentForm {
            title: "Dentist".into(),
            remind_minutes_before: Some(i64::MIN),
            ..AppointmentForm::default()
        };
        assert_eq!(form.submit(None, "u1"), Err(ValidationError::Negative("Reminder")));

        let form = AppointmentForm {
            remind_minutes_before: Some(0),
            ..form
        };
        assert!(form.submit(None, "u1").is_ok());
    }

    #[test]
    fn test_unsaved_existing_creates() {
        let draft = Doctor::new("u1".into(), "Ana".into(), "GP".into());
        let form = DoctorForm::from_existing(&draft);
        assert!(matches!(form.submit(Some(&draft), "u1").unwrap(), EditOutcome::Create(_)));
    }

    #[test]
    fn test_doctor_requires_specialty() {
        let form = DoctorForm {
            full_name: "Ana".into(),
            ..DoctorForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::Required("Specialty")));
    }

    #[test]
    fn test_medication_round_trips_through_form() {
        let mut med = Medication::new("u1".into(), "Amoxicillin".into(), Timestamp::from_micros(3));
        med.strength = Some("500 mg".into());
        med.end_date = Some(Timestamp::from_micros(10));

        let rebuilt = MedicationForm::from_existing(&med).to_entity("u1");
        assert_eq!(rebuilt.name, med.name);
        assert_eq!(rebuilt.strength, med.strength);
        assert_eq!(rebuilt.end_date, med.end_date);
        assert_eq!(rebuilt.notes, None);
    }

    #[test]
    fn test_note_needs_content_and_defaults_category() {
        let form = NoteForm {
            title: "Allergies".into(),
            ..NoteForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::Required("Content")));

        let form = NoteForm {
            title: "Allergies".into(),
            content: "Penicillin".into(),
            category: " ".into(),
            ..NoteForm::default()
        };
        let EditOutcome::Create(note) = form.submit(None, "u1").unwrap() else {
            panic!("expected create");
        };
        assert_eq!(note.category, NOTE_CATEGORY);
        assert_eq!(note.provider, SELF_PROVIDER);
        assert_eq!(note.content.as_deref(), Some("Penicillin"));
    }
}
