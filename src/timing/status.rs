use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{clock_time::ClockTime, daily::DaySchedule, schedule::WeeklySchedule};
use crate::error::ScheduleError;

/// Language of the labels handed to the presentation layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Id,
}

impl Locale {
    pub fn day_name(&self, day: Weekday) -> &'static str {
        match (*self, day) {
            (Locale::En, Weekday::Sun) => "Sunday",
            (Locale::En, Weekday::Mon) => "Monday",
            (Locale::En, Weekday::Tue) => "Tuesday",
            (Locale::En, Weekday::Wed) => "Wednesday",
            (Locale::En, Weekday::Thu) => "Thursday",
            (Locale::En, Weekday::Fri) => "Friday",
            (Locale::En, Weekday::Sat) => "Saturday",
            (Locale::Id, Weekday::Sun) => "Minggu",
            (Locale::Id, Weekday::Mon) => "Senin",
            (Locale::Id, Weekday::Tue) => "Selasa",
            (Locale::Id, Weekday::Wed) => "Rabu",
            (Locale::Id, Weekday::Thu) => "Kamis",
            (Locale::Id, Weekday::Fri) => "Jumat",
            (Locale::Id, Weekday::Sat) => "Sabtu",
        }
    }

    fn open_label(&self) -> &'static str {
        match self {
            Locale::En => "Open now",
            Locale::Id => "Buka Sekarang",
        }
    }

    fn closed_label(&self) -> &'static str {
        match self {
            Locale::En => "Closed now",
            Locale::Id => "Tutup Sekarang",
        }
    }

    fn unset_label(&self) -> &'static str {
        match self {
            Locale::En => "No schedule set",
            Locale::Id => "Jadwal belum diatur",
        }
    }

    fn unset_window(&self) -> &'static str {
        match self {
            Locale::En => "Not configured",
            Locale::Id => "Belum diatur",
        }
    }
}

/// How a window that runs past midnight is reported once the date has rolled over.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvernightPolicy {
    /// Only the current day's own record is consulted. Friday 19:00-02:00 stops counting
    /// at Saturday 00:00 unless Saturday's own hours cover the time.
    #[default]
    CurrentDay,
    /// Also check whether yesterday's overnight window still covers the current time.
    PreviousDaySpillover,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusOptions {
    pub locale: Locale,
    pub overnight: OvernightPolicy,
}

/// Color class of the status badge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Open,
    Closed,
    Unset,
}

/// Open/closed display payload for one instant. Derived on every evaluation, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub is_open: bool,
    pub label: String,
    pub display_window: String,
    pub day: String,
    pub badge: Badge,
}

impl StatusResult {
    fn from_window(timing: &DaySchedule, is_open: bool, locale: Locale) -> Self {
        Self {
            is_open,
            label: if is_open {
                locale.open_label()
            } else {
                locale.closed_label()
            }
            .to_string(),
            display_window: timing.display_window(),
            day: locale.day_name(timing.day()).to_string(),
            badge: if is_open { Badge::Open } else { Badge::Closed },
        }
    }

    /// The degraded result shown when the day has no usable hours.
    pub fn unset(day: Weekday, locale: Locale) -> Self {
        Self {
            is_open: false,
            label: locale.unset_label().to_string(),
            display_window: locale.unset_window().to_string(),
            day: locale.day_name(day).to_string(),
            badge: Badge::Unset,
        }
    }
}

/// Evaluate the schedule at a local wall-clock instant.
///
/// Fails with `MissingSchedule` when the current day has no entry (and, under the spillover
/// policy, yesterday's window does not reach into today).
pub fn evaluate(
    schedule: &WeeklySchedule,
    at: NaiveDateTime,
    options: StatusOptions,
) -> Result<StatusResult, ScheduleError> {
    let today = at.weekday();
    let now = ClockTime::of(&at);

    if options.overnight == OvernightPolicy::PreviousDaySpillover {
        let today_open = schedule.get(today).is_some_and(|timing| timing.covers(now));
        if !today_open {
            if let Some(yesterday) = schedule.get(today.pred()) {
                if yesterday.spills_over_to(now) {
                    return Ok(StatusResult::from_window(yesterday, true, options.locale));
                }
            }
        }
    }

    let timing = schedule.lookup(today)?;
    Ok(StatusResult::from_window(
        timing,
        timing.covers(now),
        options.locale,
    ))
}

/// Like `evaluate`, but never fails. Errors degrade to the "No schedule set" result.
pub fn status_at(schedule: &WeeklySchedule, at: NaiveDateTime, options: StatusOptions) -> StatusResult {
    match evaluate(schedule, at, options) {
        Ok(status) => status,
        Err(err) => {
            debug!(%at, error = %err, "falling back to unset status");
            StatusResult::unset(at.weekday(), options.locale)
        }
    }
}
