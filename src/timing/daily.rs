use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::clock_time::ClockTime;
use crate::error::ScheduleError;

/// One weekday's opening and closing time.
///
/// `closes_at` earlier than `opens_at` means the window runs past midnight.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(alias = "hari", with = "day_key")]
    day: Weekday,
    #[serde(alias = "buka", alias = "open_time")]
    opens_at: ClockTime,
    #[serde(alias = "tutup", alias = "close_time")]
    closes_at: ClockTime,
}

impl DaySchedule {
    pub fn new(day: Weekday, opens_at: ClockTime, closes_at: ClockTime) -> Self {
        Self {
            day,
            opens_at,
            closes_at,
        }
    }

    /// Build from raw strings as they arrive from a form or a database row.
    pub fn parse(day: &str, opens_at: &str, closes_at: &str) -> Result<Self, ScheduleError> {
        Ok(Self::new(
            parse_day(day)?,
            opens_at.parse()?,
            closes_at.parse()?,
        ))
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn opens_at(&self) -> ClockTime {
        self.opens_at
    }

    pub fn closes_at(&self) -> ClockTime {
        self.closes_at
    }

    pub fn is_overnight(&self) -> bool {
        self.closes_at < self.opens_at
    }

    /// Whether `time` falls inside this day's own window. Both ends are inclusive, and a
    /// zero length window (`opens_at == closes_at`) is open for that single minute only.
    pub fn covers(&self, time: ClockTime) -> bool {
        if self.is_overnight() {
            time >= self.opens_at || time <= self.closes_at
        } else {
            self.opens_at <= time && time <= self.closes_at
        }
    }

    /// Whether `time` on the following day is still inside this day's overnight window.
    pub fn spills_over_to(&self, time: ClockTime) -> bool {
        self.is_overnight() && time <= self.closes_at
    }

    pub fn display_window(&self) -> String {
        format!("{}-{}", self.opens_at, self.closes_at)
    }
}

/// Parse a weekday from English short or long names, or the Indonesian names the
/// admin panel stores (`senin`, `selasa`, ...). Case is ignored.
pub fn parse_day(name: &str) -> Result<Weekday, ScheduleError> {
    let day = match name.trim().to_lowercase().as_str() {
        "sun" | "sunday" | "minggu" => Weekday::Sun,
        "mon" | "monday" | "senin" => Weekday::Mon,
        "tue" | "tuesday" | "selasa" => Weekday::Tue,
        "wed" | "wednesday" | "rabu" => Weekday::Wed,
        "thu" | "thursday" | "kamis" => Weekday::Thu,
        "fri" | "friday" | "jumat" | "jum'at" => Weekday::Fri,
        "sat" | "saturday" | "sabtu" => Weekday::Sat,
        _ => return Err(ScheduleError::UnknownDay(name.to_string())),
    };
    Ok(day)
}

/// Lowercase short key used on the wire and in the database.
pub fn day_key_of(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sun",
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
    }
}

mod day_key {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::day_key_of(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let name = String::deserialize(deserializer)?;
        super::parse_day(&name).map_err(de::Error::custom)
    }
}
