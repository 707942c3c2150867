// src/overlay.rs
//
// Supervisor operations layered over trainee logs: validating entries,
// retracting validation and marking special workdays (rest days or holidays
// the trainee was nonetheless required to work).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::logs::{validate_hours, DailyLogEntry, LogEntryError, LogStatus};
use crate::store::{TrackerStore, UserId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("no log entry for {user_id} on {date}")]
    EntryNotFound { user_id: String, date: NaiveDate },
    #[error(transparent)]
    InvalidHours(#[from] LogEntryError),
}

/// Stamps a supervisor's approval on an existing entry. Idempotent: a
/// second validation simply refreshes the stamp.
pub fn validate_entry(
    store: &TrackerStore,
    user_id: &str,
    date: NaiveDate,
    supervisor_id: &str,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> Result<DailyLogEntry, OverlayError> {
    let mut entry = store
        .get_log(user_id, date)
        .ok_or_else(|| OverlayError::EntryNotFound {
            user_id: user_id.to_string(),
            date,
        })?;
    entry.is_validated = true;
    entry.validated_by = Some(supervisor_id.to_string());
    entry.validated_at = Some(at);
    entry.validation_notes = notes;
    info!("{} validated {} for {}", supervisor_id, date, user_id);
    Ok(store.upsert_log(user_id, entry))
}

/// Retracts a validation. The reason is for the audit trail in the logs;
/// the entry itself only records that validation is gone.
pub fn invalidate_entry(
    store: &TrackerStore,
    user_id: &str,
    date: NaiveDate,
    supervisor_id: &str,
    reason: Option<String>,
) -> Result<DailyLogEntry, OverlayError> {
    let mut entry = store
        .get_log(user_id, date)
        .ok_or_else(|| OverlayError::EntryNotFound {
            user_id: user_id.to_string(),
            date,
        })?;
    entry.clear_validation();
    info!(
        "{} invalidated {} for {} (reason: {})",
        supervisor_id,
        date,
        user_id,
        reason.as_deref().unwrap_or("none given")
    );
    Ok(store.upsert_log(user_id, entry))
}

/// Marks a date as a special workday, upserting a completed entry for it.
/// The date may be a weekend, a holiday or an ordinary working day; no
/// schedule check applies, that is the point of the overlay. When the entry
/// already exists its hours and tasks survive unless new values are given.
pub fn mark_special_workday(
    store: &TrackerStore,
    user_id: &str,
    date: NaiveDate,
    reason: String,
    hours_worked: Option<Decimal>,
    tasks: Option<String>,
    default_hours: Decimal,
) -> Result<DailyLogEntry, OverlayError> {
    if let Some(hours) = hours_worked {
        validate_hours(hours)?;
    }
    let mut entry = match store.get_log(user_id, date) {
        Some(existing) => existing,
        None => DailyLogEntry::new(date, hours_worked.unwrap_or(default_hours), LogStatus::Completed),
    };
    if let Some(hours) = hours_worked {
        entry.hours_worked = hours;
    }
    if tasks.is_some() {
        entry.tasks = tasks;
    }
    entry.status = LogStatus::Completed;
    entry.is_special_workday = true;
    entry.special_workday_reason = Some(reason);
    info!("Marked {} as special workday for {}", date, user_id);
    Ok(store.upsert_log(user_id, entry))
}

/// Clears the special marking while leaving the logged work in place.
pub fn remove_special_workday(
    store: &TrackerStore,
    user_id: &str,
    date: NaiveDate,
) -> Result<DailyLogEntry, OverlayError> {
    let mut entry = store
        .get_log(user_id, date)
        .ok_or_else(|| OverlayError::EntryNotFound {
            user_id: user_id.to_string(),
            date,
        })?;
    entry.is_special_workday = false;
    entry.special_workday_reason = None;
    info!("Removed special workday marking on {} for {}", date, user_id);
    Ok(store.upsert_log(user_id, entry))
}

// --- Bulk Validation ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkValidationOutcome {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub validated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Validates a batch of `(trainee, date)` pairs, skipping over failures so
/// one missing entry cannot sink the rest of the batch.
pub fn bulk_validate(
    store: &TrackerStore,
    items: &[(UserId, NaiveDate)],
    supervisor_id: &str,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> Vec<BulkValidationOutcome> {
    let mut outcomes = Vec::with_capacity(items.len());
    for (user_id, date) in items {
        let outcome = match validate_entry(store, user_id, *date, supervisor_id, notes.clone(), at)
        {
            Ok(_) => BulkValidationOutcome {
                user_id: user_id.clone(),
                date: *date,
                validated: true,
                error: None,
            },
            Err(err) => BulkValidationOutcome {
                user_id: user_id.clone(),
                date: *date,
                validated: false,
                error: Some(err.to_string()),
            },
        };
        outcomes.push(outcome);
    }
    let failed = outcomes.iter().filter(|o| !o.validated).count();
    info!(
        "Bulk validation by {}: {} ok, {} failed",
        supervisor_id,
        outcomes.len() - failed,
        failed
    );
    outcomes
}
