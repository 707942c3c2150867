// src/reports.rs
use anyhow::{Context, Result};
use csv::Writer;

use crate::dates::format_iso_date;
use crate::logs::DailyLogEntry;

/// Renders a log history as CSV, one row per entry in the order given.
/// Empty optional fields become empty cells; timestamps use RFC 3339.
pub fn logs_to_csv(entries: &[DailyLogEntry]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record([
            "date",
            "status",
            "hoursWorked",
            "tasks",
            "specialWorkday",
            "specialWorkdayReason",
            "validated",
            "validatedBy",
            "validatedAt",
            "validationNotes",
        ])
        .context("Writing CSV header")?;

    for entry in entries {
        writer
            .write_record([
                format_iso_date(entry.date),
                entry.status.as_str().to_string(),
                entry.hours_worked.to_string(),
                entry.tasks.clone().unwrap_or_default(),
                entry.is_special_workday.to_string(),
                entry.special_workday_reason.clone().unwrap_or_default(),
                entry.is_validated.to_string(),
                entry.validated_by.clone().unwrap_or_default(),
                entry
                    .validated_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default(),
                entry.validation_notes.clone().unwrap_or_default(),
            ])
            .with_context(|| format!("Writing CSV row for {}", entry.date))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Flushing CSV output: {}", e))
}
