//! Configuration management for the reward validator.
//!
//! Configuration is read from environment variables:
//! - `GOOGLE_ACCESS_TOKEN` - Required. OAuth bearer token with Gmail and Calendar read scopes.
//! - `GMAIL_API_URL` - Optional. Defaults to `https://gmail.googleapis.com/gmail/v1`.
//! - `CALENDAR_API_URL` - Optional. Defaults to `https://www.googleapis.com/calendar/v3`.
//! - `CALENDAR_ID` - Optional. Defaults to `primary`.
//! - `MAX_MESSAGE_RESULTS` - Optional. Page size for mail searches. Defaults to `10`.
//! - `MAX_EVENT_RESULTS` - Optional. Page size for calendar listings. Defaults to `50`.
//! - `CALENDAR_LOOKAHEAD_DAYS` - Optional. 1 to 366. Defaults to `7`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Per-request timeout. Defaults to `30`.
//! - `MAX_RETRIES` - Optional. Retries for transient errors. Defaults to `2`.
//! - `CLOCK_SKEW_TOLERANCE_SECS` - Optional. At most 86400. Defaults to `300`.

use std::time::Duration;
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::external::{GoogleWorkspaceSettings, RetryConfig};
use crate::util::env_var_parse;

/// Accepted range for `CALENDAR_LOOKAHEAD_DAYS`.
pub const LOOKAHEAD_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=366;

/// Upper bound for `CLOCK_SKEW_TOLERANCE_SECS`.
pub const MAX_CLOCK_SKEW_TOLERANCE_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Validator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth access token handed over by the authorization helper
    pub google_access_token: String,

    /// Google endpoint and paging settings
    pub google: GoogleWorkspaceSettings,

    /// Allowed lead of external timestamps over the local clock
    pub clock_skew_tolerance: Duration,
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var_parse(name, default).map_err(|e| ConfigError::InvalidValue(name.to_string(), e))
}

fn check_range<T>(name: &str, value: T, range: std::ops::RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("{} is outside {}..={}", value, range.start(), range.end()),
        ))
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GOOGLE_ACCESS_TOKEN` is not set,
    /// `ConfigError::InvalidValue` if a numeric variable does not parse or is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let google_access_token = std::env::var("GOOGLE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_ACCESS_TOKEN".to_string()))?;

        let defaults = GoogleWorkspaceSettings::default();
        let google = GoogleWorkspaceSettings {
            gmail_api_url: std::env::var("GMAIL_API_URL").unwrap_or(defaults.gmail_api_url),
            calendar_api_url: std::env::var("CALENDAR_API_URL")
                .unwrap_or(defaults.calendar_api_url),
            calendar_id: std::env::var("CALENDAR_ID").unwrap_or(defaults.calendar_id),
            max_messages: parse_var("MAX_MESSAGE_RESULTS", defaults.max_messages)?,
            max_events: parse_var("MAX_EVENT_RESULTS", defaults.max_events)?,
            lookahead_days: check_range(
                "CALENDAR_LOOKAHEAD_DAYS",
                parse_var("CALENDAR_LOOKAHEAD_DAYS", defaults.lookahead_days)?,
                LOOKAHEAD_DAYS_RANGE,
            )?,
            request_timeout: Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 30u64)?),
            retry: RetryConfig {
                max_retries: parse_var("MAX_RETRIES", defaults.retry.max_retries)?,
                ..defaults.retry
            },
        };

        if google.max_messages == 0 || google.max_events == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_MESSAGE_RESULTS/MAX_EVENT_RESULTS".to_string(),
                "page size must be at least 1".to_string(),
            ));
        }

        let clock_skew_tolerance = Duration::from_secs(check_range(
            "CLOCK_SKEW_TOLERANCE_SECS",
            parse_var("CLOCK_SKEW_TOLERANCE_SECS", 300u64)?,
            0..=MAX_CLOCK_SKEW_TOLERANCE_SECS,
        )?);

        Ok(Self {
            google_access_token,
            google,
            clock_skew_tolerance,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(google_access_token: String) -> Self {
        Self {
            google_access_token,
            google: GoogleWorkspaceSettings::default(),
            clock_skew_tolerance: Duration::from_secs(300),
        }
    }

    /// Engine settings derived from this config.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            clock_skew_tolerance: chrono::Duration::from_std(self.clock_skew_tolerance)
                .unwrap_or_else(|_| chrono::Duration::minutes(5)),
        }
    }
}
