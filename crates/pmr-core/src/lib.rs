//! PMR Core Library
//!
//! Personal medical record: appointments, doctors, medications and records,
//! each kept in an owner-scoped, sorted list backed by a document store.
//!
//! # Architecture
//!
//! ```text
//!   UI event ─► Form::submit ─► EditOutcome ─► ListCache ─► Repository ─► DocumentStore
//!                                                  │                          (SQLite)
//!                                                  ├─► ListEvent subscribers
//!                                                  └─► ListHooks (reminders)
//! ```
//!
//! # Modules
//!
//! - [`document`]: Document field maps, typed values and timestamps
//! - [`models`]: Entity types and the [`Entity`] trait
//! - [`db`]: SQLite tables holding documents as JSON
//! - [`store`]: Document store seam and its SQLite implementation
//! - [`blob`]: Write-once file storage for uploaded records
//! - [`repository`]: Owner-scoped gateways per entity kind
//! - [`cache`]: Generic sorted list cache with change events
//! - [`editor`]: Forms that validate input and return create/update outcomes
//! - [`auth`]: Session state and credential checks
//! - [`reminders`]: Appointment reminder scheduling
//! - [`config`]: Startup configuration

pub mod auth;
pub mod blob;
pub mod cache;
pub mod config;
pub mod db;
pub mod document;
pub mod editor;
pub mod logging;
pub mod models;
pub mod reminders;
pub mod repository;
pub mod store;

// Re-export commonly used types
pub use auth::{AuthProvider, AuthState, Session};
pub use cache::{ListCache, ListEvent, ReconcilePolicy};
pub use config::CoreConfig;
pub use db::Database;
pub use document::{Document, Timestamp, Value};
pub use editor::{EditOutcome, Form};
pub use models::{Appointment, Doctor, Entity, Medication, Record, RecordKind};
pub use repository::{RecordUpload, Repository};
pub use store::{DocumentStore, SqliteStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use blob::{BlobStore, DirBlobStore};
use editor::{AppointmentForm, DoctorForm, MedicationForm, NoteForm};
use reminders::{AppointmentReminders, InMemoryScheduler, Reminder};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PmrError {
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<store::StoreError> for PmrError {
    fn from(e: store::StoreError) -> Self {
        PmrError::StoreError(e.to_string())
    }
}

impl From<repository::RepoError> for PmrError {
    fn from(e: repository::RepoError) -> Self {
        PmrError::StoreError(e.to_string())
    }
}

impl From<config::ConfigError> for PmrError {
    fn from(e: config::ConfigError) -> Self {
        PmrError::ConfigError(e.to_string())
    }
}

impl From<editor::ValidationError> for PmrError {
    fn from(e: editor::ValidationError) -> Self {
        PmrError::InvalidInput(e.to_string())
    }
}

impl From<auth::CredentialError> for PmrError {
    fn from(e: auth::CredentialError) -> Self {
        PmrError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PmrError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PmrError::StoreError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the log subscriber. Safe to call more than once.
#[uniffi::export]
pub fn init_logging(filter: String) -> bool {
    logging::init_logging(&filter)
}

/// Open the core from a JSON [`CoreConfig`].
#[uniffi::export]
pub fn open_core(config_json: String) -> Result<Arc<PmrCore>, PmrError> {
    let config = CoreConfig::from_json_str(&config_json)?;
    PmrCore::open(config).map(Arc::new)
}

/// Open the core over an in-memory database (for testing).
#[uniffi::export]
pub fn open_core_in_memory(blob_root: String) -> Result<Arc<PmrCore>, PmrError> {
    PmrCore::open(CoreConfig::in_memory(blob_root)).map(Arc::new)
}

// =========================================================================
// Main API Object
// =========================================================================

/// One signed-in session with a list cache per entity kind.
#[derive(uniffi::Object)]
pub struct PmrCore {
    config: CoreConfig,
    session: Arc<Session>,
    blobs: Arc<dyn BlobStore>,
    scheduler: Arc<InMemoryScheduler>,
    appointments: Arc<Mutex<ListCache<Appointment>>>,
    doctors: Arc<Mutex<ListCache<Doctor>>>,
    medications: Arc<Mutex<ListCache<Medication>>>,
    records: Arc<Mutex<ListCache<Record>>>,
}

impl PmrCore {
    /// Wire the store, session, scheduler and caches from `config`.
    pub fn open(config: CoreConfig) -> Result<Self, PmrError> {
        config.validate()?;
        logging::init_logging(&config.log_filter);
        let sqlite = if config.is_in_memory() {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(&config.database_path)?
        };
        let store: Arc<dyn DocumentStore> = Arc::new(sqlite);
        let session = Arc::new(Session::new());
        let auth: Arc<dyn AuthProvider> = session.clone();
        let scheduler = Arc::new(InMemoryScheduler::new());

        let reminders = AppointmentReminders::new(Arc::clone(&scheduler), config.reminder_min_lead());
        let appointments = ListCache::new(Arc::clone(&store), Arc::clone(&auth))
            .with_policy(config.reconcile)
            .with_hooks(reminders);
        let doctors = ListCache::new(Arc::clone(&store), Arc::clone(&auth)).with_policy(config.reconcile);
        let medications =
            ListCache::new(Arc::clone(&store), Arc::clone(&auth)).with_policy(config.reconcile);
        let records = ListCache::new(store, auth).with_policy(config.reconcile);

        tracing::info!(database = %config.database_path, "pmr core opened");
        Ok(Self {
            blobs: Arc::new(DirBlobStore::new(config.blob_root.clone())),
            config,
            session,
            scheduler,
            appointments: Arc::new(Mutex::new(appointments)),
            doctors: Arc::new(Mutex::new(doctors)),
            medications: Arc::new(Mutex::new(medications)),
            records: Arc::new(Mutex::new(records)),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn owner(&self) -> Result<String, PmrError> {
        self.session.current_user_id().ok_or(PmrError::NotSignedIn)
    }
}

/// Load a cache and return its items.
fn load_list<E: Entity, F: From<E>>(cache: &Mutex<ListCache<E>>) -> Result<Vec<F>, PmrError> {
    let mut cache = cache.lock()?;
    cache.load();
    Ok(cache.items().iter().cloned().map(F::from).collect())
}

fn search_list<E: Entity, F: From<E>>(
    cache: &Mutex<ListCache<E>>,
    query: String,
) -> Result<Vec<F>, PmrError> {
    let mut cache = cache.lock()?;
    cache.set_query(query);
    Ok(cache.filtered().into_iter().map(F::from).collect())
}

/// Run a form through the editor, then hand the outcome to the cache.
fn submit_form<E: Entity, F: Form<E>>(
    cache: &Mutex<ListCache<E>>,
    owner_id: &str,
    existing_id: Option<String>,
    form: F,
) -> Result<E, PmrError> {
    let mut cache = cache.lock()?;
    let existing = match existing_id {
        Some(id) => Some(match cache.find(&id) {
            Some(entity) => entity.clone(),
            None => cache
                .repository()
                .get(owner_id, &id)?
                .ok_or_else(|| PmrError::NotFound(id.clone()))?,
        }),
        None => None,
    };

    match form.submit(existing.as_ref(), owner_id)? {
        EditOutcome::Create(entity) => cache.add(entity).ok_or_else(|| last_error(&cache)),
        EditOutcome::Update { id, patch } => {
            if !cache.update(&id, patch) {
                return Err(last_error(&cache));
            }
            cache.find(&id).cloned().ok_or(PmrError::NotFound(id))
        }
    }
}

fn delete_from<E: Entity>(cache: &Mutex<ListCache<E>>, ids: &[String]) -> Result<(), PmrError> {
    let mut cache = cache.lock()?;
    if cache.delete(ids) {
        Ok(())
    } else {
        Err(last_error(&cache))
    }
}

fn last_error<E: Entity>(list: &ListCache<E>) -> PmrError {
    match list.error() {
        Some(cache::NOT_SIGNED_IN) => PmrError::NotSignedIn,
        Some(message) => PmrError::StoreError(message.to_string()),
        None => PmrError::StoreError("unknown failure".to_string()),
    }
}

fn error_of<E: Entity>(cache: &Mutex<ListCache<E>>) -> Result<Option<String>, PmrError> {
    Ok(cache.lock()?.error().map(str::to_string))
}

#[uniffi::export]
impl PmrCore {
    // =========================================================================
    // Session
    // =========================================================================

    /// Record the user id returned by the identity provider.
    pub fn sign_in(&self, user_id: String) -> Result<(), PmrError> {
        if user_id.trim().is_empty() {
            return Err(PmrError::InvalidInput("user id cannot be empty".into()));
        }
        self.session.sign_in(user_id);
        Ok(())
    }

    /// Sign out and drop every cached list.
    pub fn sign_out(&self) -> Result<(), PmrError> {
        self.session.sign_out();
        self.appointments.lock()?.clear();
        self.doctors.lock()?.clear();
        self.medications.lock()?.clear();
        self.records.lock()?.clear();
        Ok(())
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.session.current_user_id()
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    pub fn check_login(&self, email: String, password: String) -> Result<(), PmrError> {
        Ok(auth::check_login(&email, &password)?)
    }

    pub fn check_signup(
        &self,
        full_name: String,
        email: String,
        password: String,
        confirm_password: String,
        accepted_terms: bool,
    ) -> Result<(), PmrError> {
        let form = auth::SignupForm {
            full_name,
            email,
            password,
            confirm_password,
            accepted_terms,
        };
        Ok(auth::check_signup(&form)?)
    }

    /// Score from 0 to 5.
    pub fn password_strength(&self, password: String) -> u8 {
        auth::password_strength(&password)
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    pub fn load_appointments(&self) -> Result<Vec<FfiAppointment>, PmrError> {
        load_list(&self.appointments)
    }

    pub fn search_appointments(&self, query: String) -> Result<Vec<FfiAppointment>, PmrError> {
        search_list(&self.appointments, query)
    }

    /// Blank form pre-filled with the configured reminder lead time.
    pub fn new_appointment_form(&self) -> FfiAppointmentForm {
        AppointmentForm::new(self.config.default_reminder_minutes).into()
    }

    /// Create when `existing_id` is absent, otherwise update that appointment.
    pub fn submit_appointment(
        &self,
        existing_id: Option<String>,
        form: FfiAppointmentForm,
    ) -> Result<FfiAppointment, PmrError> {
        let owner = self.owner()?;
        let form: AppointmentForm = form.into();
        submit_form(&self.appointments, &owner, existing_id, form).map(Into::into)
    }

    pub fn delete_appointments(&self, ids: Vec<String>) -> Result<(), PmrError> {
        delete_from(&self.appointments, &ids)
    }

    pub fn last_error_appointments(&self) -> Result<Option<String>, PmrError> {
        error_of(&self.appointments)
    }

    /// Reminders waiting to fire, ordered by identifier.
    pub fn pending_reminders(&self) -> Vec<FfiReminder> {
        self.scheduler.pending().into_iter().map(Into::into).collect()
    }

    // =========================================================================
    // Doctors
    // =========================================================================

    pub fn load_doctors(&self) -> Result<Vec<FfiDoctor>, PmrError> {
        load_list(&self.doctors)
    }

    pub fn search_doctors(&self, query: String) -> Result<Vec<FfiDoctor>, PmrError> {
        search_list(&self.doctors, query)
    }

    pub fn submit_doctor(
        &self,
        existing_id: Option<String>,
        form: FfiDoctorForm,
    ) -> Result<FfiDoctor, PmrError> {
        let owner = self.owner()?;
        let form: DoctorForm = form.into();
        submit_form(&self.doctors, &owner, existing_id, form).map(Into::into)
    }

    pub fn delete_doctors(&self, ids: Vec<String>) -> Result<(), PmrError> {
        delete_from(&self.doctors, &ids)
    }

    pub fn last_error_doctors(&self) -> Result<Option<String>, PmrError> {
        error_of(&self.doctors)
    }

    // =========================================================================
    // Medications
    // =========================================================================

    pub fn load_medications(&self) -> Result<Vec<FfiMedication>, PmrError> {
        load_list(&self.medications)
    }

    pub fn search_medications(&self, query: String) -> Result<Vec<FfiMedication>, PmrError> {
        search_list(&self.medications, query)
    }

    pub fn submit_medication(
        &self,
        existing_id: Option<String>,
        form: FfiMedicationForm,
    ) -> Result<FfiMedication, PmrError> {
        let owner = self.owner()?;
        let form: MedicationForm = form.into();
        submit_form(&self.medications, &owner, existing_id, form).map(Into::into)
    }

    pub fn delete_medications(&self, ids: Vec<String>) -> Result<(), PmrError> {
        delete_from(&self.medications, &ids)
    }

    pub fn last_error_medications(&self) -> Result<Option<String>, PmrError> {
        error_of(&self.medications)
    }

    // =========================================================================
    // Records
    // =========================================================================

    pub fn load_records(&self) -> Result<Vec<FfiRecord>, PmrError> {
        load_list(&self.records)
    }

    pub fn search_records(&self, query: String) -> Result<Vec<FfiRecord>, PmrError> {
        search_list(&self.records, query)
    }

    /// Create a free-text note; the record list reloads afterwards.
    pub fn create_note(&self, form: FfiNoteForm) -> Result<FfiRecord, PmrError> {
        let owner = self.owner()?;
        let form: NoteForm = form.into();
        let note = match form.submit(None, &owner)? {
            EditOutcome::Create(note) => note,
            EditOutcome::Update { id, .. } => return Err(PmrError::InvalidInput(id)),
        };
        let mut records = self.records.lock()?;
        records
            .create_note(note)
            .map(Into::into)
            .ok_or_else(|| last_error(&records))
    }

    /// Edit a note, or create one when `existing_id` is absent.
    pub fn submit_record(
        &self,
        existing_id: Option<String>,
        form: FfiNoteForm,
    ) -> Result<FfiRecord, PmrError> {
        if existing_id.is_none() {
            return self.create_note(form);
        }
        let owner = self.owner()?;
        let form: NoteForm = form.into();
        submit_form(&self.records, &owner, existing_id, form).map(Into::into)
    }

    /// Store a file and create the record that points at it.
    ///
    /// `file_name` supplies the extension and, when `title` is blank, the title.
    pub fn upload_record(
        &self,
        bytes: Vec<u8>,
        file_name: String,
        title: Option<String>,
        provider: Option<String>,
        category: Option<String>,
        date_of_service_micros: Option<i64>,
    ) -> Result<FfiRecord, PmrError> {
        let mut upload = RecordUpload::new(bytes, file_name);
        upload.title = title;
        if let Some(provider) = provider.filter(|p| !p.trim().is_empty()) {
            upload.provider = provider;
        }
        if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
            upload.category = category;
        }
        if let Some(micros) = date_of_service_micros {
            upload.date_of_service = Timestamp::from_micros(micros);
        }

        let mut records = self.records.lock()?;
        records
            .upload(self.blobs.as_ref(), upload)
            .map(Into::into)
            .ok_or_else(|| last_error(&records))
    }

    pub fn delete_records(&self, ids: Vec<String>) -> Result<(), PmrError> {
        delete_from(&self.records, &ids)
    }

    pub fn last_error_records(&self) -> Result<Option<String>, PmrError> {
        error_of(&self.records)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe appointment. Timestamps are microseconds since the Unix epoch.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: Option<String>,
    pub title: String,
    pub provider: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub start_at_micros: i64,
    pub end_at_micros: Option<i64>,
    pub is_all_day: bool,
    pub remind_minutes_before: Option<i64>,
    pub created_at_micros: i64,
    pub updated_at_micros: i64,
}

impl From<Appointment> for FfiAppointment {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            title: a.title,
            provider: a.provider,
            location: a.location,
            notes: a.notes,
            start_at_micros: a.start_at.as_micros(),
            end_at_micros: a.end_at.map(|t| t.as_micros()),
            is_all_day: a.is_all_day,
            remind_minutes_before: a.remind_minutes_before,
            created_at_micros: a.created_at.as_micros(),
            updated_at_micros: a.updated_at.as_micros(),
        }
    }
}

/// FFI-safe appointment editor input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentForm {
    pub title: String,
    pub provider: String,
    pub location: String,
    pub notes: String,
    pub start_at_micros: i64,
    pub end_at_micros: Option<i64>,
    pub is_all_day: bool,
    pub remind_minutes_before: Option<i64>,
}

impl From<AppointmentForm> for FfiAppointmentForm {
    fn from(f: AppointmentForm) -> Self {
        Self {
            title: f.title,
            provider: f.provider,
            location: f.location,
            notes: f.notes,
            start_at_micros: f.start_at.as_micros(),
            end_at_micros: f.end_at.map(|t| t.as_micros()),
            is_all_day: f.is_all_day,
            remind_minutes_before: f.remind_minutes_before,
        }
    }
}

impl From<FfiAppointmentForm> for AppointmentForm {
    fn from(f: FfiAppointmentForm) -> Self {
        AppointmentForm {
            title: f.title,
            provider: f.provider,
            location: f.location,
            notes: f.notes,
            start_at: Timestamp::from_micros(f.start_at_micros),
            end_at: f.end_at_micros.map(Timestamp::from_micros),
            is_all_day: f.is_all_day,
            remind_minutes_before: f.remind_minutes_before,
        }
    }
}

/// FFI-safe doctor.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctor {
    pub id: Option<String>,
    pub full_name: String,
    pub specialty: String,
    pub clinic_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at_micros: i64,
    pub updated_at_micros: Option<i64>,
}

impl From<Doctor> for FfiDoctor {
    fn from(d: Doctor) -> Self {
        Self {
            id: d.id,
            full_name: d.full_name,
            specialty: d.specialty,
            clinic_name: d.clinic_name,
            phone: d.phone,
            email: d.email,
            address: d.address,
            created_at_micros: d.created_at.as_micros(),
            updated_at_micros: d.updated_at.map(|t| t.as_micros()),
        }
    }
}

/// FFI-safe doctor editor input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctorForm {
    pub full_name: String,
    pub specialty: String,
    pub clinic_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl From<FfiDoctorForm> for DoctorForm {
    fn from(f: FfiDoctorForm) -> Self {
        DoctorForm {
            full_name: f.full_name,
            specialty: f.specialty,
            clinic_name: f.clinic_name,
            phone: f.phone,
            email: f.email,
            address: f.address,
        }
    }
}

/// FFI-safe medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: Option<String>,
    pub name: String,
    pub strength: Option<String>,
    pub form: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub start_date_micros: i64,
    pub end_date_micros: Option<i64>,
    pub prescribed_by: Option<String>,
    pub notes: Option<String>,
    /// Whether the course is still running now
    pub active: bool,
}

impl From<Medication> for FfiMedication {
    fn from(m: Medication) -> Self {
        let active = m.is_active_at(Timestamp::now());
        Self {
            id: m.id,
            name: m.name,
            strength: m.strength,
            form: m.form,
            route: m.route,
            frequency: m.frequency,
            instructions: m.instructions,
            start_date_micros: m.start_date.as_micros(),
            end_date_micros: m.end_date.map(|t| t.as_micros()),
            prescribed_by: m.prescribed_by,
            notes: m.notes,
            active,
        }
    }
}

/// FFI-safe medication editor input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationForm {
    pub name: String,
    pub strength: String,
    pub form: String,
    pub route: String,
    pub frequency: String,
    pub instructions: String,
    pub start_date_micros: i64,
    pub end_date_micros: Option<i64>,
    pub prescribed_by: String,
    pub notes: String,
}

impl From<FfiMedicationForm> for MedicationForm {
    fn from(f: FfiMedicationForm) -> Self {
        MedicationForm {
            name: f.name,
            strength: f.strength,
            form: f.form,
            route: f.route,
            frequency: f.frequency,
            instructions: f.instructions,
            start_date: Timestamp::from_micros(f.start_date_micros),
            end_date: f.end_date_micros.map(Timestamp::from_micros),
            prescribed_by: f.prescribed_by,
            notes: f.notes,
        }
    }
}

/// Record kind (FFI-safe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiRecordKind {
    Note,
    Document,
    Other,
}

impl From<RecordKind> for FfiRecordKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Note => FfiRecordKind::Note,
            RecordKind::Document => FfiRecordKind::Document,
            RecordKind::Other => FfiRecordKind::Other,
        }
    }
}

/// FFI-safe record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecord {
    pub id: Option<String>,
    pub kind: FfiRecordKind,
    pub title: String,
    pub provider: String,
    pub category: String,
    pub date_of_service_micros: i64,
    pub content: Option<String>,
    pub file_url: Option<String>,
}

impl From<Record> for FfiRecord {
    fn from(r: Record) -> Self {
        Self {
            kind: r.kind().into(),
            id: r.id,
            title: r.title,
            provider: r.provider,
            category: r.category,
            date_of_service_micros: r.date_of_service.as_micros(),
            content: r.content,
            file_url: r.file_url,
        }
    }
}

/// FFI-safe note editor input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNoteForm {
    pub title: String,
    pub content: String,
    pub category: String,
    pub provider: String,
    pub date_of_service_micros: i64,
}

impl From<FfiNoteForm> for NoteForm {
    fn from(f: FfiNoteForm) -> Self {
        NoteForm {
            title: f.title,
            content: f.content,
            category: f.category,
            provider: f.provider,
            date_of_service: Timestamp::from_micros(f.date_of_service_micros),
        }
    }
}

/// FFI-safe pending reminder.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminder {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub fire_after_secs: u64,
}

impl From<Reminder> for FfiReminder {
    fn from(r: Reminder) -> Self {
        Self {
            identifier: r.identifier,
            title: r.title,
            body: r.body,
            fire_after_secs: r.fire_after.as_secs(),
        }
    }
}
