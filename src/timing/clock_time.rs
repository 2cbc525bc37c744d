use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::Timelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// A wall-clock time of day, stored as minutes since midnight (0..=1439).
///
/// Only the strict `HH:MM` 24 hour form is accepted. These are local times of day,
/// never timestamps, so there is no date or zone attached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

fn time_regex() -> &'static Regex {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("static pattern"))
}

impl ClockTime {
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::Format(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Time of day of any chrono value, truncated to the minute.
    pub fn of<T: Timelike>(time: &T) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn hour(&self) -> u16 {
        self.minutes / 60
    }

    pub fn minute(&self) -> u16 {
        self.minutes % 60
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = time_regex()
            .captures(s)
            .ok_or_else(|| ScheduleError::Format(s.to_string()))?;
        // The pattern only admits two digit groups in range
        let hour: u16 = captures[1]
            .parse()
            .map_err(|_| ScheduleError::Format(s.to_string()))?;
        let minute: u16 = captures[2]
            .parse()
            .map_err(|_| ScheduleError::Format(s.to_string()))?;
        Self::from_hm(hour, minute)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}
