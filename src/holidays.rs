// src/holidays.rs
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::info;

// --- Holiday Data Structures ---

/// Philippine holiday classification. Both kinds suppress a working day when
/// the schedule excludes holidays; the split matters for display and for
/// pay-rule tooling built on top of the exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayKind {
    Regular,
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub date: NaiveDate,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HolidayKind,
}

/// Date-keyed holiday table. At most one record per date; when a source
/// lists a date twice the later record wins.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    by_date: BTreeMap<NaiveDate, HolidayRecord>,
    years: BTreeSet<i32>,
}

impl HolidayCalendar {
    pub fn from_records(records: Vec<HolidayRecord>) -> Self {
        let mut calendar = HolidayCalendar::default();
        for record in records {
            calendar.years.insert(record.date.year());
            calendar.by_date.insert(record.date, record);
        }
        calendar
    }

    /// Loads a holiday table from a JSON file containing an array of
    /// `{date, name, type}` records, replacing the built-in table.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading holiday file {:?}", path))?;
        let records: Vec<HolidayRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Parsing holiday file {:?}", path))?;
        let calendar = Self::from_records(records);
        info!(
            "Loaded {} holidays covering years {:?} from {:?}",
            calendar.len(),
            calendar.years,
            path
        );
        Ok(calendar)
    }

    pub fn lookup(&self, date: NaiveDate) -> Option<&HolidayRecord> {
        self.by_date.get(&date)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    /// All holidays with `start <= date <= end`, ascending by date.
    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&HolidayRecord> {
        if start > end {
            return Vec::new();
        }
        self.by_date.range(start..=end).map(|(_, rec)| rec).collect()
    }

    /// Whether the table carries at least one entry for the given year. A
    /// year with no entries is treated as holiday-free, which callers may
    /// want to surface rather than silently trust.
    pub fn covers_year(&self, year: i32) -> bool {
        self.years.contains(&year)
    }

    /// Years touched by `[start, end]` that have no entries in the table.
    pub fn missing_years(&self, start: NaiveDate, end: NaiveDate) -> Vec<i32> {
        if start > end {
            return Vec::new();
        }
        (start.year()..=end.year())
            .filter(|year| !self.years.contains(year))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

// --- Built-in Philippine Holiday Table ---

use HolidayKind::{Regular, Special};

static BUILTIN: Lazy<HolidayCalendar> = Lazy::new(|| {
    let mut records: Vec<(i32, u32, u32, &str, HolidayKind)> = Vec::new();

    // 2025
    records.extend([
        (2025, 1, 1, "New Year's Day", Regular),
        (2025, 1, 29, "Chinese New Year", Special),
        (2025, 3, 31, "Eid'l Fitr", Regular),
        (2025, 4, 9, "Araw ng Kagitingan", Regular),
        (2025, 4, 17, "Maundy Thursday", Regular),
        (2025, 4, 18, "Good Friday", Regular),
        (2025, 4, 19, "Black Saturday", Special),
        (2025, 5, 1, "Labor Day", Regular),
        (2025, 6, 6, "Eid'l Adha", Regular),
        (2025, 6, 12, "Independence Day", Regular),
        (2025, 8, 21, "Ninoy Aquino Day", Special),
        (2025, 8, 25, "National Heroes Day", Regular),
        (2025, 10, 31, "All Saints' Day Eve", Special),
        (2025, 11, 1, "All Saints' Day", Special),
        (2025, 11, 30, "Bonifacio Day", Regular),
        (2025, 12, 8, "Feast of the Immaculate Conception", Special),
        (2025, 12, 24, "Christmas Eve", Special),
        (2025, 12, 25, "Christmas Day", Regular),
        (2025, 12, 30, "Rizal Day", Regular),
        (2025, 12, 31, "Last Day of the Year", Special),
    ]);

    // 2026
    records.extend([
        (2026, 1, 1, "New Year's Day", Regular),
        (2026, 2, 17, "Chinese New Year", Special),
        (2026, 3, 20, "Eid'l Fitr", Regular),
        (2026, 4, 2, "Maundy Thursday", Regular),
        (2026, 4, 3, "Good Friday", Regular),
        (2026, 4, 4, "Black Saturday", Special),
        (2026, 4, 9, "Araw ng Kagitingan", Regular),
        (2026, 5, 1, "Labor Day", Regular),
        (2026, 5, 27, "Eid'l Adha", Regular),
        (2026, 6, 12, "Independence Day", Regular),
        (2026, 8, 21, "Ninoy Aquino Day", Special),
        (2026, 8, 31, "National Heroes Day", Regular),
        (2026, 11, 1, "All Saints' Day", Special),
        (2026, 11, 30, "Bonifacio Day", Regular),
        (2026, 12, 8, "Feast of the Immaculate Conception", Special),
        (2026, 12, 24, "Christmas Eve", Special),
        (2026, 12, 25, "Christmas Day", Regular),
        (2026, 12, 30, "Rizal Day", Regular),
        (2026, 12, 31, "Last Day of the Year", Special),
    ]);

    HolidayCalendar::from_records(
        records
            .into_iter()
            .map(|(y, m, d, name, kind)| HolidayRecord {
                date: NaiveDate::from_ymd_opt(y, m, d).expect("valid built-in holiday date"),
                name: name.to_string(),
                kind,
            })
            .collect(),
    )
});

/// The compiled-in Philippine holiday table, used when no external holiday
/// file is configured.
pub fn builtin_calendar() -> &'static HolidayCalendar {
    &BUILTIN
}
