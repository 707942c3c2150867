// src/logs.rs
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// --- Core Data Structures ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Scheduled,
    Completed,
    Holiday,
    Off,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Scheduled => "scheduled",
            LogStatus::Completed => "completed",
            LogStatus::Holiday => "holiday",
            LogStatus::Off => "off",
        }
    }
}

/// One trainee-day of logged work. Supervisor validation and the special
/// workday overlay live on the entry itself so an export carries the whole
/// story for a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogEntry {
    pub date: NaiveDate,
    pub hours_worked: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<String>,
    pub status: LogStatus,
    #[serde(default)]
    pub is_special_workday: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_workday_reason: Option<String>,
    #[serde(default)]
    pub is_validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_notes: Option<String>,
}

impl DailyLogEntry {
    pub fn new(date: NaiveDate, hours_worked: Decimal, status: LogStatus) -> Self {
        DailyLogEntry {
            date,
            hours_worked,
            tasks: None,
            status,
            is_special_workday: false,
            special_workday_reason: None,
            is_validated: false,
            validated_by: None,
            validated_at: None,
            validation_notes: None,
        }
    }

    /// Clears supervisor validation. Used both when a supervisor explicitly
    /// invalidates an entry and when a trainee edits an already validated
    /// one, since the validated content no longer exists.
    pub fn clear_validation(&mut self) {
        self.is_validated = false;
        self.validated_by = None;
        self.validated_at = None;
        self.validation_notes = None;
    }
}

// --- Validation ---

pub const MAX_DAILY_HOURS: Decimal = dec!(24);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogEntryError {
    #[error("hoursWorked must be between 0 and 24, got {value}")]
    HoursOutOfRange { value: Decimal },
}

pub fn validate_hours(value: Decimal) -> Result<(), LogEntryError> {
    if value < Decimal::ZERO || value > MAX_DAILY_HOURS {
        return Err(LogEntryError::HoursOutOfRange { value });
    }
    Ok(())
}

// --- Aggregation Policy ---

/// Collapses a log history to at most one entry per date, keeping only
/// entries that count toward progress: status must be `completed`. Should a
/// caller hand over duplicate dates, the last entry wins.
pub fn completed_by_date(entries: &[DailyLogEntry]) -> BTreeMap<NaiveDate, &DailyLogEntry> {
    let mut by_date = BTreeMap::new();
    for entry in entries {
        if entry.status == LogStatus::Completed {
            by_date.insert(entry.date, entry);
        }
    }
    by_date
}
