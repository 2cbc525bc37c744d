use chrono::Weekday;
use thiserror::Error;

/// Errors raised while building or evaluating an operating-hours schedule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("malformed time '{0}', expected HH:MM (24 hour)")]
    Format(String),

    #[error("no operating hours set for {0}")]
    MissingSchedule(Weekday),

    #[error("unknown day '{0}'")]
    UnknownDay(String),

    #[error("{0} appears more than once in the schedule")]
    DuplicateDay(Weekday),
}

/// Errors from the SQLite backed schedule store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not get a database connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Errors while loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not deserialize config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid default schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("unknown timezone '{0}'")]
    Timezone(String),

    #[error("refresh interval must be at least one second")]
    Interval,
}

/// Anything that stops the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not open database: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("could not bind listener: {0}")]
    Io(#[from] std::io::Error),
}
