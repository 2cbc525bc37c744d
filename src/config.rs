use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    error::ConfigError,
    timing::{
        daily::DaySchedule,
        schedule::WeeklySchedule,
        status::{Locale, OvernightPolicy, StatusOptions},
    },
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Service configuration. Every field is optional in the JSON file.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind: String,
    pub database: String,
    /// IANA zone name. `None` uses the system zone.
    pub timezone: Option<String>,
    pub refresh_interval_secs: u64,
    pub locale: Locale,
    pub overnight_policy: OvernightPolicy,
    pub log_format: LogFormat,
    /// Seeded into an empty database at startup.
    pub default_schedule: Vec<DaySchedule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
            database: "cafe.db".to_string(),
            timezone: None,
            refresh_interval_secs: 30,
            locale: Locale::default(),
            overnight_policy: OvernightPolicy::default(),
            log_format: LogFormat::default(),
            default_schedule: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_config(config: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_config(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Interval);
        }
        self.default_schedule()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn status_options(&self) -> StatusOptions {
        StatusOptions {
            locale: self.locale,
            overnight: self.overnight_policy,
        }
    }

    pub fn default_schedule(&self) -> Result<WeeklySchedule, ConfigError> {
        Ok(WeeklySchedule::from_days(self.default_schedule.iter().copied())?)
    }
}
