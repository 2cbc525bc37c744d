use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::daily::DaySchedule;
use crate::error::ScheduleError;

/// The full weekly operating hours of a venue.
///
/// One slot per weekday, indexed from Sunday. A day with no entry has no declared hours.
/// Serializes as the list of declared days, Sunday first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DaySchedule>", into = "Vec<DaySchedule>")]
pub struct WeeklySchedule {
    timings: [Option<DaySchedule>; 7],
}

fn slot(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of entries. Naming the same day twice is an error.
    pub fn from_days<I>(days: I) -> Result<Self, ScheduleError>
    where
        I: IntoIterator<Item = DaySchedule>,
    {
        let mut schedule = Self::new();
        for day in days {
            if schedule.get(day.day()).is_some() {
                return Err(ScheduleError::DuplicateDay(day.day()));
            }
            schedule.set(day);
        }
        Ok(schedule)
    }

    /// Set a day's hours, replacing whatever that day had.
    pub fn set(&mut self, timing: DaySchedule) -> Option<DaySchedule> {
        self.timings[slot(timing.day())].replace(timing)
    }

    pub fn get(&self, day: Weekday) -> Option<&DaySchedule> {
        self.timings[slot(day)].as_ref()
    }

    /// Like `get` but reports a missing day as an error.
    pub fn lookup(&self, day: Weekday) -> Result<&DaySchedule, ScheduleError> {
        self.get(day).ok_or(ScheduleError::MissingSchedule(day))
    }

    pub fn days(&self) -> impl Iterator<Item = &DaySchedule> {
        self.timings.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.days().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<Vec<DaySchedule>> for WeeklySchedule {
    type Error = ScheduleError;

    fn try_from(value: Vec<DaySchedule>) -> Result<Self, Self::Error> {
        Self::from_days(value)
    }
}

impl From<WeeklySchedule> for Vec<DaySchedule> {
    fn from(value: WeeklySchedule) -> Self {
        value.days().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(name: &str, open: &str, close: &str) -> DaySchedule {
        DaySchedule::parse(name, open, close).unwrap()
    }

    #[test]
    fn lookup_by_weekday() {
        let schedule = WeeklySchedule::from_days([
            day("mon", "08:00", "17:00"),
            day("fri", "19:00", "02:00"),
        ])
        .unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.get(Weekday::Mon), Some(&day("mon", "08:00", "17:00")));
        assert_eq!(schedule.get(Weekday::Tue), None);
        assert_eq!(
            schedule.lookup(Weekday::Sat),
            Err(ScheduleError::MissingSchedule(Weekday::Sat))
        );
    }

    #[test]
    fn rejects_duplicate_days() {
        let result = WeeklySchedule::from_days([
            day("mon", "08:00", "17:00"),
            day("senin", "09:00", "18:00"),
        ]);
        assert_eq!(result, Err(ScheduleError::DuplicateDay(Weekday::Mon)));
    }

    #[test]
    fn set_replaces_existing_day() {
        let mut schedule = WeeklySchedule::new();
        assert!(schedule.set(day("wed", "08:00", "17:00")).is_none());
        let old = schedule.set(day("wed", "10:00", "22:00"));
        assert_eq!(old, Some(day("wed", "08:00", "17:00")));
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.get(Weekday::Wed), Some(&day("wed", "10:00", "22:00")));
    }

    #[test]
    fn serializes_sunday_first() {
        let schedule = WeeklySchedule::from_days([
            day("sat", "10:00", "23:00"),
            day("sun", "10:00", "20:00"),
        ])
        .unwrap();
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json[0]["day"], "sun");
        assert_eq!(json[1]["day"], "sat");
        let back: WeeklySchedule = serde_json::from_value(json).unwrap();
        assert_eq!(back, schedule);
    }
}
