use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::DEFAULT_AVATAR_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Forum root, e.g. `https://forum.example.com`. No trailing slash.
    pub base_url: String,

    // Avatar cache
    pub avatar_dir: PathBuf,
    pub default_avatar_url: String,

    // Session cookie persistence
    pub cookie_file: PathBuf,

    // Crawl pacing
    pub page_delay: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: required_env("FORUM_BASE_URL")?.trim_end_matches('/').to_string(),
            avatar_dir: PathBuf::from(env_or_default("AVATAR_DIR", "assets/avatar")),
            default_avatar_url: env_or_default("DEFAULT_AVATAR_URL", DEFAULT_AVATAR_URL),
            cookie_file: PathBuf::from(env_or_default("COOKIE_FILE", "cookie.json")),
            page_delay: Duration::from_millis(parse_env_u64("PAGE_DELAY_MS", 300)?),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 10)?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            name: "FORUM_BASE_URL".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_BASE_URL".to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration for tests: localhost endpoints, no pacing delay.
    ///
    /// Tests override individual fields with struct-update syntax.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://127.0.0.1:1".to_string(),
            avatar_dir: PathBuf::from("./test-avatars"),
            default_avatar_url: "http://127.0.0.1:1/default.png".to_string(),
            cookie_file: PathBuf::from("./test-cookie.json"),
            page_delay: Duration::ZERO,
            http_timeout: Duration::from_secs(5),
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
