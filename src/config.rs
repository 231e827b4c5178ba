//! Provider configuration.
//!
//! Configuration is an explicit value constructed by the process entry
//! point and handed to the orchestrator; the orchestration modules never
//! read environment or hold module-level client state themselves.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::GenError;

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.apiyi.com";

/// Delay between async job status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum status polls before an async job is considered timed out
/// (300 x 5s, roughly 25 minutes of wall clock).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

/// Configuration for a provider connection.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key attached as a bearer credential to every provider call.
    pub api_key: SecretString,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Delay between async job polls.
    pub poll_interval: Duration,
    /// Polling budget for async jobs.
    pub max_poll_attempts: u32,
    /// Request timeout for non-streaming HTTP calls.
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            timeout: None,
        }
    }

    /// Read `APIYI_API_KEY` / `APIYI_BASE_URL` from the environment.
    ///
    /// Intended for process entry points; library code receives the
    /// constructed value.
    pub fn from_env() -> Result<Self, GenError> {
        let api_key = std::env::var("APIYI_API_KEY")
            .map_err(|_| GenError::InternalError("APIYI_API_KEY is not configured".to_string()))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("APIYI_BASE_URL") {
            let trimmed = base_url.trim();
            if !trimmed.is_empty() {
                config.base_url = trimmed.to_string();
            }
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(GenError::InternalError(
                "provider API key is empty".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(GenError::InternalError(
                "provider base URL is empty".to_string(),
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(GenError::InternalError(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("timeout", &self.timeout)
            .field("has_api_key", &!self.api_key.expose_secret().is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = ProviderConfig::new("sk-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_poll_attempts, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_key_fails_validation() {
        let config = ProviderConfig::new("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_does_not_leak_the_key() {
        let config = ProviderConfig::new("sk-secret-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret-value"));
    }
}
