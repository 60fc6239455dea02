// ABOUTME: Configuration module for the bildumilo application
// ABOUTME: Provides configuration settings and environment variable handling

use crate::errors::{BildumiloError, Result};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MATHJAX_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.5/MathJax.js?config=TeX-MML-AM_CHTML";

pub const MATHJAX_ENV: &str = "HOVERCRAFT_MATHJAX";

/// Horizontal distance between consecutive slides, in pixels
pub const DEFAULT_MOVEMENT: i64 = 1600;

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub mathjax_url: String,
    pub browser_path: Option<String>,
    pub pdf_timeout_ms: u64,
    pub default_movement: i64,
    pub dot_command: String,
    /// Upper bound on how long the regeneration loop waits between checks
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mathjax_url: DEFAULT_MATHJAX_URL.to_string(),
            browser_path: None,
            pdf_timeout_ms: 30000, // 30 seconds
            default_movement: DEFAULT_MOVEMENT,
            dot_command: "dot".to_string(),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let mathjax_url = env::var(MATHJAX_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.mathjax_url);
        validate_url(&mathjax_url)?;

        let browser_path = env::var("BROWSER_PATH").ok().filter(|s| !s.is_empty());
        let pdf_timeout_ms = env::var("PDF_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.pdf_timeout_ms);
        let dot_command = env::var("BILDUMILO_DOT")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.dot_command);

        Ok(Self {
            mathjax_url,
            browser_path,
            pdf_timeout_ms,
            dot_command,
            ..defaults
        })
    }
}

/// Check that a configured URL is absolute
pub fn validate_url(value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| BildumiloError::ConfigError(format!("Invalid URL {:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mathjax_is_valid() {
        let config = Config::default();
        assert_eq!(config.mathjax_url, DEFAULT_MATHJAX_URL);
        assert!(validate_url(&config.mathjax_url).is_ok());
    }

    #[test]
    fn test_relative_url_is_rejected() {
        let err = validate_url("mathjax/MathJax.js").unwrap_err();
        assert!(matches!(err, BildumiloError::ConfigError(_)));
    }
}
