//! Environment-driven settings.
//!
//! The env contract: `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `DEFAULT_MODEL`,
//! `RATE_LIMIT_PER_MINUTE`, `MAX_RETRIES`, `LOG_LEVEL`. Malformed numeric
//! values fall back to defaults rather than failing startup.

use crate::api::rate_limit::RateLimiter;
use crate::api::retry::RetryConfig;
use crate::{ChatClient, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Runtime settings gathered from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub rate_limit_per_minute: u32,
    pub max_retries: u32,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_per_minute: 60,
            max_retries: 3,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: std::env::var("DEFAULT_MODEL").unwrap_or(defaults.model),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            rate_limit_per_minute: parse_or(
                std::env::var("RATE_LIMIT_PER_MINUTE").ok(),
                defaults.rate_limit_per_minute,
            ),
            max_retries: parse_or(std::env::var("MAX_RETRIES").ok(), defaults.max_retries),
            log_level: std::env::var("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or(defaults.log_level),
        }
    }

    /// Assemble a ready [`ChatClient`]: base URL, rate limiter, and retry
    /// policy applied. Fails if no API key is configured.
    pub fn client(&self) -> Result<ChatClient, String> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| "OPENAI_API_KEY environment variable is not set".to_string())?;

        Ok(ChatClient::new(api_key)?
            .with_base_url(&self.base_url)
            .with_rate_limiter(RateLimiter::per_minute(self.rate_limit_per_minute))
            .with_retry(RetryConfig::with_retries(self.max_retries)))
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
