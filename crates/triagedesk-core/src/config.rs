//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable for the backend base URL.
pub const ENV_API_URL: &str = "TRIAGEDESK_API_URL";
/// Environment variable for the poll interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "TRIAGEDESK_POLL_INTERVAL_MS";
/// Environment variable for the request timeout in milliseconds.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TRIAGEDESK_REQUEST_TIMEOUT_MS";
/// Environment variable for the health-check interval in milliseconds.
pub const ENV_HEALTH_CHECK_INTERVAL_MS: &str = "TRIAGEDESK_HEALTH_CHECK_INTERVAL_MS";
/// Environment variable for the session status interval in milliseconds.
pub const ENV_AUTH_STATUS_INTERVAL_MS: &str = "TRIAGEDESK_AUTH_STATUS_INTERVAL_MS";
/// Environment variable for the retry attempt limit.
pub const ENV_MAX_RETRY_ATTEMPTS: &str = "TRIAGEDESK_MAX_RETRY_ATTEMPTS";
/// Environment variable for the retry delay in milliseconds.
pub const ENV_RETRY_DELAY_MS: &str = "TRIAGEDESK_RETRY_DELAY_MS";

/// Dashboard client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL.
    pub api_base_url: String,
    /// Background poll interval.
    pub poll_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Health-check interval.
    pub health_check_interval: Duration,
    /// Salesforce session re-check interval.
    pub auth_status_interval: Duration,
    /// Total attempts per list fetch.
    pub max_retry_attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            poll_interval: Duration::from_secs(20),
            request_timeout: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(30),
            auth_status_interval: Duration::from_secs(30),
            max_retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed, or the resulting
    /// configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is malformed or the resulting configuration
    /// is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(ms) = parse_var(&lookup, ENV_POLL_INTERVAL_MS)? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_REQUEST_TIMEOUT_MS)? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_HEALTH_CHECK_INTERVAL_MS)? {
            config.health_check_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_AUTH_STATUS_INTERVAL_MS)? {
            config.auth_status_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var(&lookup, ENV_MAX_RETRY_ATTEMPTS)? {
            config.max_retry_attempts = attempts;
        }
        if let Some(ms) = parse_var(&lookup, ENV_RETRY_DELAY_MS)? {
            config.retry_delay = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Overrides the backend base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty base URL, zero attempts, or a zero
    /// interval or timeout.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("API base URL must not be empty".into()));
        }
        if self.max_retry_attempts == 0 {
            return Err(Error::Config(
                "max retry attempts must be at least 1".into(),
            ));
        }

        let intervals = [
            ("poll interval", self.poll_interval),
            ("request timeout", self.request_timeout),
            ("health check interval", self.health_check_interval),
            ("auth status interval", self.auth_status_interval),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, d)| d.is_zero()) {
            return Err(Error::Config(format!("{name} must be greater than zero")));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key}: invalid value {raw:?}")))
}
