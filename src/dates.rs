// src/dates.rs
use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Wire format for all dates handled by the service.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid date '{input}': expected YYYY-MM-DD")]
pub struct DateParseError {
    pub input: String,
}

/// Parses a calendar date from its ISO-8601 form. Rejects anything that is
/// not a real date ("2026-02-30", "2026-13-01", junk strings).
pub fn parse_iso_date(input: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(input, ISO_DATE_FORMAT).map_err(|_| DateParseError {
        input: input.to_string(),
    })
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Weekday index with Sunday = 0 through Saturday = 6, matching the
/// `workDays` encoding used in schedule configurations.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
