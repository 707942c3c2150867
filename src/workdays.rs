// src/workdays.rs
use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::dates::weekday_index;
use crate::holidays::HolidayCalendar;

/// Upper bound on forward scans, roughly ten years of calendar days. A
/// projection that cannot land within this window is reported as unavailable
/// instead of looping unbounded (e.g. a schedule whose work days are all
/// holidays in an externally supplied table).
pub const MAX_SCAN_DAYS: u32 = 3660;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkdayScanError {
    #[error("no working day found within {scanned} days after {from}")]
    HorizonExhausted { from: NaiveDate, scanned: u32 },
    #[error("date arithmetic overflow while scanning forward from {from}")]
    DateOverflow { from: NaiveDate },
}

/// Whether `date` counts as a working day: its weekday must be scheduled,
/// and when `exclude_holidays` is set the date must not appear in the
/// holiday table. Regular and special holidays both suppress the day.
pub fn is_working_day(
    date: NaiveDate,
    work_days: &BTreeSet<u8>,
    exclude_holidays: bool,
    calendar: &HolidayCalendar,
) -> bool {
    if !work_days.contains(&weekday_index(date)) {
        return false;
    }
    if exclude_holidays && calendar.is_holiday(date) {
        return false;
    }
    true
}

/// Counts working days in the inclusive range `[start, end]`. An inverted
/// range counts zero.
pub fn count_working_days(
    start: NaiveDate,
    end: NaiveDate,
    work_days: &BTreeSet<u8>,
    exclude_holidays: bool,
    calendar: &HolidayCalendar,
) -> u32 {
    if start > end {
        return 0;
    }
    let mut count = 0;
    let mut date = start;
    loop {
        if is_working_day(date, work_days, exclude_holidays, calendar) {
            count += 1;
        }
        if date == end {
            break;
        }
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    count
}

/// Finds the `n`-th working day at or after `from`, where `from` itself is
/// candidate number one when it qualifies. `n == 0` returns `from`
/// unchanged, so advancing by zero is the identity even on a non-working
/// day.
pub fn advance_to_nth_working_day(
    from: NaiveDate,
    n: u32,
    work_days: &BTreeSet<u8>,
    exclude_holidays: bool,
    calendar: &HolidayCalendar,
) -> Result<NaiveDate, WorkdayScanError> {
    if n == 0 {
        return Ok(from);
    }
    let mut date = from;
    let mut found = 0;
    let mut scanned = 0;
    loop {
        if is_working_day(date, work_days, exclude_holidays, calendar) {
            found += 1;
            if found == n {
                return Ok(date);
            }
        }
        scanned += 1;
        if scanned >= MAX_SCAN_DAYS {
            return Err(WorkdayScanError::HorizonExhausted { from, scanned });
        }
        date = date
            .checked_add_days(Days::new(1))
            .ok_or(WorkdayScanError::DateOverflow { from })?;
    }
}
