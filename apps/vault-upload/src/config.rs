//! Configuration management for vault uploads and job polling

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::slicing::{DEFAULT_PART_SIZE_RATIO, MAX_PART_SIZE_MIB, MIN_PART_SIZE_MIB};
use crate::MIB;

/// Default wait before the first job status poll: 3 hours
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(3 * 60 * 60);

/// Default interval between job status polls: 15 minutes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Payloads above this size go through multipart upload by default
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 32 * MIB;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub upload: UploadConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Target ratio between part size and part count
    pub part_size_ratio: f64,
    pub max_part_size_mib: u64,
    pub multipart_threshold: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub initial_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            part_size_ratio: DEFAULT_PART_SIZE_RATIO,
            max_part_size_mib: MAX_PART_SIZE_MIB,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            initial_wait: DEFAULT_INITIAL_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let config = Config {
            upload: UploadConfig {
                part_size_ratio: env_or("VAULT_PART_SIZE_RATIO", defaults.upload.part_size_ratio)?,
                max_part_size_mib: env_or("VAULT_MAX_PART_SIZE_MIB", defaults.upload.max_part_size_mib)?,
                multipart_threshold: env_or(
                    "VAULT_MULTIPART_THRESHOLD_BYTES",
                    defaults.upload.multipart_threshold,
                )?,
            },
            polling: PollingConfig {
                initial_wait: env_or("VAULT_JOB_INITIAL_WAIT_SECS", defaults.polling.initial_wait.as_secs())
                    .map(Duration::from_secs)?,
                poll_interval: env_or("VAULT_JOB_POLL_INTERVAL_SECS", defaults.polling.poll_interval.as_secs())
                    .map(Duration::from_secs)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the part size policy cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.upload.part_size_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::Invalid {
                var: "VAULT_PART_SIZE_RATIO",
                value: ratio.to_string(),
            });
        }

        let max = self.upload.max_part_size_mib;
        if !max.is_power_of_two() || !(MIN_PART_SIZE_MIB..=MAX_PART_SIZE_MIB).contains(&max) {
            return Err(ConfigError::Invalid {
                var: "VAULT_MAX_PART_SIZE_MIB",
                value: max.to_string(),
            });
        }

        Ok(())
    }
}

fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
