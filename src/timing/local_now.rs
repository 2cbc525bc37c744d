use chrono::{Local, NaiveDateTime};
use chrono_tz::Tz;

use crate::error::ConfigError;

/// Source of the viewer's local wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock and converts it into a fixed zone, or the system zone when none
/// is configured.
#[derive(Copy, Clone, Debug, Default)]
pub struct ZonedClock {
    timezone: Option<Tz>,
}

impl ZonedClock {
    pub fn from_name(name: Option<&str>) -> Result<Self, ConfigError> {
        let timezone = match name {
            None => None,
            Some(name) => Some(
                name.parse::<Tz>()
                    .map_err(|_| ConfigError::Timezone(name.to_string()))?,
            ),
        };
        Ok(Self { timezone })
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }
}

impl Clock for ZonedClock {
    fn now(&self) -> NaiveDateTime {
        let local_datetime = Local::now();
        match self.timezone {
            Some(timezone) => local_datetime.with_timezone(&timezone).naive_local(),
            None => local_datetime.naive_local(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iana_zone_names() {
        let clock = ZonedClock::from_name(Some("Asia/Makassar")).unwrap();
        assert_eq!(clock.timezone(), Some(chrono_tz::Asia::Makassar));
        assert!(ZonedClock::from_name(None).unwrap().timezone().is_none());
    }

    #[test]
    fn rejects_unknown_zone() {
        assert!(matches!(
            ZonedClock::from_name(Some("Mars/Olympus")),
            Err(ConfigError::Timezone(name)) if name == "Mars/Olympus"
        ));
    }
}
