//! Engine configuration.
//!
//! Defaults match production behaviour; every field can be overridden from the
//! environment or deserialized from a config document.

use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use thiserror::Error;

use ledgerguard_core::OperationName;
use ledgerguard_ledger::LedgerOperations;
use ledgerguard_limits::{Calendar, LimitsSettings, operations};

pub const ENV_MAX_FAILED_ATTEMPTS: &str = "LEDGERGUARD_MAX_FAILED_ATTEMPTS";
pub const ENV_ATTEMPT_WINDOW_HOURS: &str = "LEDGERGUARD_ATTEMPT_WINDOW_HOURS";
pub const ENV_UTC_OFFSET_MINUTES: &str = "LEDGERGUARD_UTC_OFFSET_MINUTES";
pub const ENV_DEPOSIT_OPERATION: &str = "LEDGERGUARD_DEPOSIT_OPERATION";
pub const ENV_TRANSFER_OPERATION: &str = "LEDGERGUARD_TRANSFER_OPERATION";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DB_MAX_CONNECTIONS: &str = "LEDGERGUARD_DB_MAX_CONNECTIONS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing required setting {0}")]
    Missing(&'static str),
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Failed limit checks inside the window that block the pair.
    pub max_failed_attempts: u32,
    pub attempt_window_hours: i64,
    /// Fixed offset of the local calendar; `None` follows the host time zone per instant.
    pub utc_offset_minutes: Option<i32>,
    pub deposit_operation: String,
    pub transfer_operation: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 3,
            attempt_window_hours: 24,
            utc_offset_minutes: None,
            deposit_operation: operations::DEPOSIT.to_string(),
            transfer_operation: operations::TRANSFER.to_string(),
            database_url: None,
            db_max_connections: 5,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by whichever `LEDGERGUARD_*` / `DATABASE_URL` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], reading from an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_MAX_FAILED_ATTEMPTS) {
            config.max_failed_attempts = parse(ENV_MAX_FAILED_ATTEMPTS, &v)?;
        }
        if let Some(v) = lookup(ENV_ATTEMPT_WINDOW_HOURS) {
            config.attempt_window_hours = parse(ENV_ATTEMPT_WINDOW_HOURS, &v)?;
        }
        if let Some(v) = lookup(ENV_UTC_OFFSET_MINUTES) {
            config.utc_offset_minutes = Some(parse(ENV_UTC_OFFSET_MINUTES, &v)?);
        }
        if let Some(v) = lookup(ENV_DEPOSIT_OPERATION) {
            config.deposit_operation = v;
        }
        if let Some(v) = lookup(ENV_TRANSFER_OPERATION) {
            config.transfer_operation = v;
        }
        if let Some(v) = lookup(ENV_DATABASE_URL) {
            config.database_url = Some(v);
        }
        if let Some(v) = lookup(ENV_DB_MAX_CONNECTIONS) {
            config.db_max_connections = parse(ENV_DB_MAX_CONNECTIONS, &v)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_failed_attempts(mut self, max: u32) -> Self {
        self.max_failed_attempts = max;
        self
    }

    pub fn with_attempt_window_hours(mut self, hours: i64) -> Self {
        self.attempt_window_hours = hours;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    pub fn with_transfer_operation(mut self, name: impl Into<String>) -> Self {
        self.transfer_operation = name.into();
        self
    }

    pub fn with_deposit_operation(mut self, name: impl Into<String>) -> Self {
        self.deposit_operation = name.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::invalid(ENV_MAX_FAILED_ATTEMPTS, "0", "must be at least 1"));
        }
        if self.attempt_window_hours <= 0 {
            return Err(ConfigError::invalid(
                ENV_ATTEMPT_WINDOW_HOURS,
                self.attempt_window_hours.to_string(),
                "must be positive",
            ));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::invalid(ENV_DB_MAX_CONNECTIONS, "0", "must be at least 1"));
        }
        self.calendar()?;
        self.ledger_operations()?;
        Ok(())
    }

    pub fn calendar(&self) -> Result<Calendar, ConfigError> {
        match self.utc_offset_minutes {
            None => Ok(Calendar::local()),
            Some(minutes) => minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map(Calendar::new)
                .ok_or_else(|| {
                    ConfigError::invalid(ENV_UTC_OFFSET_MINUTES, minutes.to_string(), "offset out of range")
                }),
        }
    }

    pub fn limits_settings(&self) -> Result<LimitsSettings, ConfigError> {
        let window = Duration::try_hours(self.attempt_window_hours).ok_or_else(|| {
            ConfigError::invalid(
                ENV_ATTEMPT_WINDOW_HOURS,
                self.attempt_window_hours.to_string(),
                "window out of range",
            )
        })?;
        Ok(LimitsSettings::default()
            .with_max_failed_attempts(self.max_failed_attempts)
            .with_attempt_window(window)
            .with_calendar(self.calendar()?))
    }

    pub fn ledger_operations(&self) -> Result<LedgerOperations, ConfigError> {
        let name = |key: &'static str, value: &str| {
            OperationName::new(value).map_err(|e| ConfigError::invalid(key, value, e.to_string()))
        };
        Ok(LedgerOperations {
            deposit: name(ENV_DEPOSIT_OPERATION, &self.deposit_operation)?,
            transfer: name(ENV_TRANSFER_OPERATION, &self.transfer_operation)?,
        })
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, value, e.to_string()))
}
