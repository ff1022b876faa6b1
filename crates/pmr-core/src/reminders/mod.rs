//! Fire-once reminders ahead of appointments.
//!
//! Each appointment owns at most one pending reminder, identified by
//! `appt-{id}`. Rescheduling cancels the old reminder before scheduling again.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{HookResult, ListHooks};
use crate::document::Timestamp;
use crate::models::Appointment;

/// Shortest delay a reminder is scheduled with, even if its time has passed.
pub const DEFAULT_MIN_LEAD: Duration = Duration::from_secs(5);

const FALLBACK_BODY: &str = "Upcoming appointment";

/// Reminder scheduling errors.
#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

pub type ReminderResult<T> = Result<T, ReminderError>;

/// A local alert to deliver once after a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub fire_after: Duration,
}

/// Delivers local alerts. Scheduling under an existing identifier replaces it.
pub trait ReminderScheduler: Send + Sync {
    fn schedule(&self, reminder: Reminder) -> ReminderResult<()>;

    fn cancel(&self, identifier: &str);
}

/// Deterministic reminder identifier for an appointment id.
pub fn reminder_id(appointment_id: &str) -> String {
    format!("appt-{}", appointment_id)
}

/// The reminder an appointment asks for, if any.
///
/// Unsaved appointments and appointments without a lead time get none.
pub fn plan_reminder(appt: &Appointment, now: Timestamp, min_lead: Duration) -> Option<Reminder> {
    let id = appt.id.as_deref()?;
    let minutes = appt.remind_minutes_before?;

    let fire_at = appt.start_at.plus_minutes(minutes.saturating_neg());
    let fire_after = fire_at
        .since(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .max(min_lead);

    let body = [appt.location.as_deref(), appt.provider.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(FALLBACK_BODY)
        .to_string();

    Some(Reminder {
        identifier: reminder_id(id),
        title: appt.title.clone(),
        body,
        fire_after,
    })
}

/// Cancel any pending reminder for the appointment, then schedule afresh.
pub fn reschedule<S: ReminderScheduler + ?Sized>(
    scheduler: &S,
    appt: &Appointment,
    now: Timestamp,
    min_lead: Duration,
) -> ReminderResult<()> {
    if let Some(id) = appt.id.as_deref() {
        scheduler.cancel(&reminder_id(id));
    }
    match plan_reminder(appt, now, min_lead) {
        Some(reminder) => {
            debug!(id = %reminder.identifier, after_secs = reminder.fire_after.as_secs(), "reminder scheduled");
            scheduler.schedule(reminder)
        }
        None => Ok(()),
    }
}

/// Scheduler that keeps pending reminders in memory.
#[derive(Default)]
pub struct InMemoryScheduler {
    pending: Mutex<BTreeMap<String, Reminder>>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending reminders ordered by identifier.
    pub fn pending(&self) -> Vec<Reminder> {
        self.pending
            .lock()
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl ReminderScheduler for InMemoryScheduler {
    fn schedule(&self, reminder: Reminder) -> ReminderResult<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|e| ReminderError::Scheduler(format!("Lock poisoned: {}", e)))?;
        pending.insert(reminder.identifier.clone(), reminder);
        Ok(())
    }

    fn cancel(&self, identifier: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(identifier);
        }
    }
}

/// Keeps reminders in step with an appointment list.
pub struct AppointmentReminders<S: ReminderScheduler + ?Sized> {
    scheduler: Arc<S>,
    min_lead: Duration,
}

impl<S: ReminderScheduler + ?Sized> AppointmentReminders<S> {
    pub fn new(scheduler: Arc<S>, min_lead: Duration) -> Self {
        Self {
            scheduler,
            min_lead,
        }
    }
}

impl<S: ReminderScheduler + ?Sized> ListHooks<Appointment> for AppointmentReminders<S> {
    fn created(&self, appt: &Appointment) -> HookResult {
        if let Some(reminder) = plan_reminder(appt, Timestamp::now(), self.min_lead) {
            info!(id = %reminder.identifier, "scheduling reminder");
            self.scheduler.schedule(reminder)?;
        }
        Ok(())
    }

    fn updated(&self, appt: &Appointment) -> HookResult {
        reschedule(self.scheduler.as_ref(), appt, Timestamp::now(), self.min_lead)?;
        Ok(())
    }

    fn deleted(&self, id: &str) {
        self.scheduler.cancel(&reminder_id(id));
    }
}
