// src/progress.rs
//
// Progress projection over a trainee's schedule and log history. Everything
// here is a pure function of its inputs; the clock only enters through the
// `as_of` argument supplied by the caller.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::holidays::HolidayCalendar;
use crate::logs::{completed_by_date, DailyLogEntry};
use crate::schedule::ScheduleConfig;
use crate::workdays::{advance_to_nth_working_day, count_working_days};

/// Which rate fed the projection: the observed average over logged days, or
/// the declared `hoursPerDay` from the schedule settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionBasis {
    Average,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionDetails {
    /// Working days from the schedule start through `as_of`, inclusive.
    pub working_days_from_start: u32,
    /// Distinct dates with a completed log entry.
    pub working_days_used: u32,
    /// Working days still needed at the projection rate; zero when the
    /// target is met or no rate is available.
    pub working_days_remaining: u32,
    pub average_hours_per_logged_day: Option<Decimal>,
    pub days_ahead: u32,
    pub days_behind: u32,
    pub projection_basis: ProjectionBasis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total_hours_completed: Decimal,
    pub total_days_completed: u32,
    pub remaining_hours: Decimal,
    pub remaining_days: u32,
    pub progress_percentage: Decimal,
    pub projected_end_date: Option<NaiveDate>,
    pub target_hours: u32,
    pub projection_details: ProjectionDetails,
}

/// Working days needed to cover `hours` at `per_day` hours each, rounded up.
/// `None` when hours remain but the rate is not positive.
fn days_at_rate(hours: Decimal, per_day: Decimal) -> Option<u32> {
    if hours <= Decimal::ZERO {
        return Some(0);
    }
    if per_day <= Decimal::ZERO {
        return None;
    }
    Some((hours / per_day).ceil().to_u32().unwrap_or(u32::MAX))
}

/// Computes the full progress snapshot for one trainee as of a given date.
///
/// The projection rate is chosen as follows: with `autoProjection` on and at
/// least one completed day logged, the observed average drives the scan
/// forward from `as_of`; with `autoProjection` on but nothing logged yet,
/// the declared rate drives the scan from the schedule start date; with
/// `autoProjection` off, the declared rate drives the scan from `as_of`.
pub fn compute_progress(
    config: &ScheduleConfig,
    entries: &[DailyLogEntry],
    calendar: &HolidayCalendar,
    as_of: NaiveDate,
) -> ProgressSnapshot {
    let completed = completed_by_date(entries);
    let total_days_completed = completed.len() as u32;
    let total_hours_completed: Decimal = completed.values().map(|e| e.hours_worked).sum();

    let target = Decimal::from(config.target_hours);
    let remaining_hours = (target - total_hours_completed).max(Decimal::ZERO);

    let progress_percentage = if config.target_hours == 0 {
        // Rejected at the API boundary; a snapshot over such a config still
        // reports something sane.
        warn!("targetHours is zero, reporting progress as complete");
        dec!(100)
    } else {
        (total_hours_completed / target * dec!(100))
            .min(dec!(100))
            .round_dp(2)
    };

    let average_hours_per_logged_day = if total_days_completed > 0 {
        Some(total_hours_completed / Decimal::from(total_days_completed))
    } else {
        None
    };

    // Day count at the declared rate, shared by the settings-basis
    // projection and the nominal remainingDays figure. A zero hoursPerDay
    // is rejected at the write boundary; over such a config the estimate
    // is simply unavailable.
    let days_at_declared_rate =
        days_at_rate(remaining_hours, Decimal::from(config.hours_per_day));
    if days_at_declared_rate.is_none() {
        warn!("hoursPerDay is zero, cannot project at the declared rate");
    }

    // Rate, scan origin and basis for the forward projection. `None` days
    // means no projection can be made at all.
    let (projection_basis, scan_from, days_to_scan): (ProjectionBasis, NaiveDate, Option<u32>) =
        if config.target_hours == 0 {
            (ProjectionBasis::Settings, as_of, None)
        } else if config.auto_projection {
            match average_hours_per_logged_day {
                Some(avg) if avg > Decimal::ZERO => (
                    ProjectionBasis::Average,
                    as_of,
                    days_at_rate(remaining_hours, avg),
                ),
                Some(_) => {
                    warn!(
                        "{} logged days sum to zero hours, cannot project from average",
                        total_days_completed
                    );
                    (ProjectionBasis::Average, as_of, None)
                }
                None => (
                    ProjectionBasis::Settings,
                    config.start_date,
                    days_at_declared_rate,
                ),
            }
        } else {
            (ProjectionBasis::Settings, as_of, days_at_declared_rate)
        };

    let projected_end_date = match days_to_scan {
        Some(days) => {
            match advance_to_nth_working_day(
                scan_from,
                days,
                &config.work_days,
                config.exclude_holidays,
                calendar,
            ) {
                Ok(date) => Some(date),
                Err(err) => {
                    warn!("Projection unavailable: {}", err);
                    None
                }
            }
        }
        None => None,
    };

    // Surface holiday table gaps covering the projected span. Uncovered
    // years are treated as holiday-free, which silently shortens the
    // projection.
    if config.exclude_holidays {
        let span_start = config.start_date.min(as_of);
        let span_end = projected_end_date.unwrap_or(as_of).max(as_of);
        let missing = calendar.missing_years(span_start, span_end);
        if !missing.is_empty() {
            warn!(
                "Holiday table has no entries for years {:?}, treating them as holiday-free",
                missing
            );
        }
    }

    // Nominal remaining days at the declared rate, independent of the
    // projection basis.
    let remaining_days = days_at_declared_rate.unwrap_or(0);

    // Pacing: completed days versus working days elapsed since the start.
    let working_days_from_start = if config.start_date <= as_of {
        count_working_days(
            config.start_date,
            as_of,
            &config.work_days,
            config.exclude_holidays,
            calendar,
        )
    } else {
        0
    };
    let pace = total_days_completed as i64 - working_days_from_start as i64;
    let (days_ahead, days_behind) = if pace >= 0 {
        (pace as u32, 0)
    } else {
        (0, (-pace) as u32)
    };

    debug!(
        "Progress as of {}: {}/{} hours over {} days, basis {:?}, projected end {:?}",
        as_of,
        total_hours_completed,
        config.target_hours,
        total_days_completed,
        projection_basis,
        projected_end_date
    );

    ProgressSnapshot {
        total_hours_completed,
        total_days_completed,
        remaining_hours,
        remaining_days,
        progress_percentage,
        projected_end_date,
        target_hours: config.target_hours,
        projection_details: ProjectionDetails {
            working_days_from_start,
            working_days_used: total_days_completed,
            working_days_remaining: days_to_scan.unwrap_or(0),
            average_hours_per_logged_day: average_hours_per_logged_day
                .map(|avg| avg.round_dp(2)),
            days_ahead,
            days_behind,
            projection_basis,
        },
    }
}
