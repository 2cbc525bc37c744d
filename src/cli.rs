use std::path::PathBuf;

use clap::Parser;

use crate::{config::Config, error::ConfigError};

/// Café operating hours service.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// JSON config file
    #[arg(short, long, env = "CAFE_HOURS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    pub bind: Option<String>,

    /// SQLite database path, overrides the config file
    #[arg(long)]
    pub database: Option<String>,

    /// Seconds between status re-evaluations, overrides the config file
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

impl Args {
    /// Load the config file (or defaults) and apply command line overrides.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(interval) = self.interval_secs {
            if interval == 0 {
                return Err(ConfigError::Interval);
            }
            config.refresh_interval_secs = interval;
        }
        Ok(config)
    }
}
