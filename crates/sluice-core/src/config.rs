//! PipelineConfig - パイプライン設定の読み込み
//!
//! # 優先順位
//! 1. defaults
//! 2. YAML file (`from_file` / `from_yaml`)
//! 3. `SLUICE_*` environment variables (`apply_env`)
//!
//! `validate` rejects values the pipeline cannot run with.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Pipeline settings. Every field has a default, so a config file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    /// Capacity of the in-memory channel; `None` uses `workers`.
    pub channel_capacity: Option<usize>,
    /// Total attempts per task.
    pub max_retries: u32,
    pub attempt_timeout_secs: u64,
    pub retry_backoff_secs: u64,
    pub retry_backoff_max_secs: u64,
    pub reconnect_backoff_secs: u64,
    pub reconnect_backoff_max_secs: u64,
    pub commit_timeout_secs: u64,
    pub drain_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            workers: 10,
            channel_capacity: None,
            max_retries: 3,
            attempt_timeout_secs: 120,
            retry_backoff_secs: 5,
            retry_backoff_max_secs: 60,
            reconnect_backoff_secs: 1,
            reconnect_backoff_max_secs: 30,
            commit_timeout_secs: 10,
            drain_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply `SLUICE_*` environment overrides on top of the current values.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = parse_var(&lookup, "SLUICE_WORKERS")? {
            self.workers = v;
        }
        if let Some(v) = parse_var(&lookup, "SLUICE_MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "SLUICE_ATTEMPT_TIMEOUT_SECS")? {
            self.attempt_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "SLUICE_COMMIT_TIMEOUT_SECS")? {
            self.commit_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "SLUICE_DRAIN_TIMEOUT_SECS")? {
            self.drain_timeout_secs = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.channel_capacity == Some(0) {
            return Err(invalid("channel_capacity", "must be at least 1"));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must be at least 1"));
        }
        for (field, value) in [
            ("attempt_timeout_secs", self.attempt_timeout_secs),
            ("retry_backoff_secs", self.retry_backoff_secs),
            ("reconnect_backoff_secs", self.reconnect_backoff_secs),
            ("commit_timeout_secs", self.commit_timeout_secs),
            ("drain_timeout_secs", self.drain_timeout_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        if self.retry_backoff_max_secs < self.retry_backoff_secs {
            return Err(invalid("retry_backoff_max_secs", "must not be below retry_backoff_secs"));
        }
        if self.reconnect_backoff_max_secs < self.reconnect_backoff_secs {
            return Err(invalid(
                "reconnect_backoff_max_secs",
                "must not be below reconnect_backoff_secs",
            ));
        }
        Ok(())
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(self.workers)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_secs(self.retry_backoff_secs),
            multiplier: 2.0,
            max_delay: Some(Duration::from_secs(self.retry_backoff_max_secs)),
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    pub fn reconnect_backoff_max(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_max_secs)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value }),
        _ => Ok(None),
    }
}
