// src/schedule.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const DEFAULT_TARGET_HOURS: u32 = 500;
pub const DEFAULT_HOURS_PER_DAY: u32 = 8;
pub const MIN_HOURS_PER_DAY: u32 = 1;
pub const MAX_HOURS_PER_DAY: u32 = 12;

/// Per-trainee schedule settings. `work_days` holds weekday indices with
/// Sunday = 0 through Saturday = 6; the set form keeps membership checks and
/// the serialized order canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub target_hours: u32,
    pub start_date: NaiveDate,
    pub hours_per_day: u32,
    pub exclude_holidays: bool,
    pub work_days: BTreeSet<u8>,
    pub auto_projection: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleConfigError {
    #[error("targetHours must be greater than zero")]
    TargetHoursZero,
    #[error("hoursPerDay must be between 1 and 12, got {value}")]
    HoursPerDayOutOfRange { value: u32 },
    #[error("workDays must contain at least one weekday")]
    WorkDaysEmpty,
    #[error("workDays contains {index}, expected indices 0 (Sunday) through 6 (Saturday)")]
    WorkDayIndexOutOfRange { index: u8 },
}

impl ScheduleConfig {
    /// The schedule a trainee starts with before touching any settings:
    /// 500 target hours at 8 hours per day, Monday through Friday, holidays
    /// excluded, projection following observed pace.
    pub fn defaults_starting(start_date: NaiveDate) -> Self {
        ScheduleConfig {
            target_hours: DEFAULT_TARGET_HOURS,
            start_date,
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            exclude_holidays: true,
            work_days: BTreeSet::from([1, 2, 3, 4, 5]),
            auto_projection: true,
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleConfigError> {
        if self.target_hours == 0 {
            return Err(ScheduleConfigError::TargetHoursZero);
        }
        if self.hours_per_day < MIN_HOURS_PER_DAY || self.hours_per_day > MAX_HOURS_PER_DAY {
            return Err(ScheduleConfigError::HoursPerDayOutOfRange {
                value: self.hours_per_day,
            });
        }
        if self.work_days.is_empty() {
            return Err(ScheduleConfigError::WorkDaysEmpty);
        }
        if let Some(&index) = self.work_days.iter().find(|&&i| i > 6) {
            return Err(ScheduleConfigError::WorkDayIndexOutOfRange { index });
        }
        Ok(())
    }
}
