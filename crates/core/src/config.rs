//! Environment configuration

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::lichess::LICHESS_API_BASE;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_token: Option<String>,
    pub api_base: String,
    pub opponent: Option<String>,
    pub listen_timeout: Duration,
    pub max_attempts: u32,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: LICHESS_API_BASE.to_string(),
            opponent: None,
            listen_timeout: Duration::from_secs(5),
            max_attempts: 5,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Reads the process environment after loading `.env`, if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_token: text("LICHESS_API_TOKEN"),
            api_base: text("LICHESS_API_BASE").unwrap_or(defaults.api_base),
            opponent: text("LICHESS_OPPONENT"),
            listen_timeout: text("VOICE_LISTEN_TIMEOUT_SECS")
                .map(|v| number("VOICE_LISTEN_TIMEOUT_SECS", &v).map(Duration::from_secs))
                .transpose()?
                .unwrap_or(defaults.listen_timeout),
            max_attempts: text("VOICE_MAX_ATTEMPTS")
                .map(|v| number("VOICE_MAX_ATTEMPTS", &v))
                .transpose()?
                .unwrap_or(defaults.max_attempts as u64) as u32,
            http_timeout: text("HTTP_TIMEOUT_SECS")
                .map(|v| number("HTTP_TIMEOUT_SECS", &v).map(Duration::from_secs))
                .transpose()?
                .unwrap_or(defaults.http_timeout),
        })
    }

    /// Remote play cannot start without a token.
    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| Error::Config("LICHESS_API_TOKEN must be set".to_string()))
    }
}

fn number(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 && n <= u32::MAX as u64 => Ok(n),
        _ => Err(Error::Config(format!(
            "{} must be a positive whole number, got {:?}",
            key, value
        ))),
    }
}
