//! Client runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the transport. Helpers here parse *values* that a binary has read from the
//! environment; they never read process-wide environment variables themselves, so tests and
//! multiple clients in one process do not interfere with each other.

use crate::constants::{DEFAULT_SAMS_URL, DEFAULT_TIMEOUT_SECS};
use crate::{SamsError, SamsResult};
use std::time::Duration;

/// Client configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SAMS_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// `base_url` must be an absolute `http` or `https` URL; a trailing slash is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SamsError::Configuration`] if the URL is invalid or the timeout is zero.
    pub fn new(base_url: &str, timeout: Duration) -> SamsResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');

        let parsed = reqwest::Url::parse(trimmed)
            .map_err(|e| SamsError::Configuration(format!("invalid SAMS URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SamsError::Configuration(format!(
                "SAMS URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if timeout.is_zero() {
            return Err(SamsError::Configuration(
                "request timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL of a CGI endpoint below the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Parse the request timeout from an optional string value (whole seconds).
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn timeout_from_env_value(value: Option<String>) -> SamsResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let secs = value
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                SamsError::Configuration(format!("timeout must be a whole number of seconds, got '{v}'"))
            })
        })
        .transpose()?;

    Ok(Duration::from_secs(secs.unwrap_or(DEFAULT_TIMEOUT_SECS)))
}

/// Build a [`ClientConfig`] from optional base URL and timeout values.
///
/// Missing or blank values fall back to the defaults.
pub fn client_config_from_env_values(
    base_url: Option<String>,
    timeout_secs: Option<String>,
) -> SamsResult<ClientConfig> {
    let timeout = timeout_from_env_value(timeout_secs)?;
    let base_url = base_url
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_SAMS_URL.to_string());

    ClientConfig::new(&base_url, timeout)
}
