//! Configuration management for Fresco.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::FreshError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path appended to the domain to reach the v2 REST API.
const API_PATH: &str = "/api/v2/";

/// Configuration for connecting to Freshservice.
///
/// The API key is stored but never logged or exposed in error messages.
#[derive(Clone)]
pub struct Config {
    /// Normalised domain (e.g., `https://acme.freshservice.com`).
    pub domain: String,

    /// Base URL for API calls, always ending in `/api/v2/`.
    pub base_url: String,

    /// Per-request timeout applied by the transport.
    pub timeout: Duration,

    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,

    /// API key for authentication.
    /// This value must never be logged or included in error messages.
    api_key: String,
}

impl Config {
    /// Builds a configuration from a domain and API key.
    ///
    /// The domain may omit the scheme (`https://` is assumed) and may end in a slash.
    ///
    /// # Errors
    ///
    /// Returns `FreshError::Config` if the domain is not a valid URL host or
    /// the API key is empty or a placeholder.
    pub fn new(domain: &str, api_key: impl Into<String>) -> Result<Self, FreshError> {
        let api_key = api_key.into();
        let domain = Self::normalize_domain(domain)?;
        Self::validate_api_key(&api_key)?;

        Ok(Config {
            base_url: format!("{}{}", domain, API_PATH),
            domain,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_ssl: true,
            api_key,
        })
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `FRESHSERVICE_DOMAIN`: The Freshservice domain (e.g. `acme.freshservice.com`)
    /// - `FRESHSERVICE_API_KEY`: The agent API key
    ///
    /// # Optional Environment Variables
    ///
    /// - `FRESHSERVICE_TIMEOUT_SECS`: Per-request timeout (default 30)
    /// - `FRESHSERVICE_VERIFY_SSL`: `false` to skip certificate checks (default true)
    ///
    /// # Errors
    ///
    /// Returns `FreshError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, FreshError> {
        let domain = Self::get_required_env("FRESHSERVICE_DOMAIN")?;
        let api_key = Self::get_required_env("FRESHSERVICE_API_KEY")?;

        let mut config = Self::new(&domain, api_key)?;

        if let Some(secs) = Self::get_optional_env("FRESHSERVICE_TIMEOUT_SECS") {
            config.timeout = Self::parse_timeout(&secs)?;
        }
        if let Some(flag) = Self::get_optional_env("FRESHSERVICE_VERIFY_SSL") {
            config.verify_ssl = Self::parse_bool("FRESHSERVICE_VERIFY_SSL", &flag)?;
        }

        Ok(config)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the API key. Never log the result.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, FreshError> {
        Self::get_optional_env(name).ok_or_else(|| FreshError::missing_env(name))
    }

    /// Gets an environment variable, treating blank values as unset.
    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Adds a scheme when missing, strips trailing slashes and checks the host.
    fn normalize_domain(domain: &str) -> Result<String, FreshError> {
        let domain = domain.trim();

        let domain = if domain.starts_with("http") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        let domain = domain.trim_end_matches('/').to_string();

        let parsed = Url::parse(&domain).map_err(|e| {
            FreshError::invalid_config(format!("FRESHSERVICE_DOMAIN is not a valid URL: {}", e))
        })?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(FreshError::invalid_config(
                "FRESHSERVICE_DOMAIN must include a host name",
            ));
        }

        Ok(domain)
    }

    /// Validates the API key is not empty or a placeholder value.
    fn validate_api_key(key: &str) -> Result<(), FreshError> {
        if key.trim().is_empty() {
            return Err(FreshError::invalid_config("FRESHSERVICE_API_KEY is empty"));
        }

        let key_lower = key.to_lowercase();
        let placeholder_patterns = ["your_api_key", "your_key", "placeholder", "changeme"];

        for pattern in placeholder_patterns {
            if key_lower.contains(pattern) {
                return Err(FreshError::invalid_config(
                    "FRESHSERVICE_API_KEY appears to be a placeholder value",
                ));
            }
        }

        Ok(())
    }

    fn parse_timeout(value: &str) -> Result<Duration, FreshError> {
        match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(FreshError::invalid_config(
                "FRESHSERVICE_TIMEOUT_SECS must be a positive number of seconds",
            )),
        }
    }

    fn parse_bool(name: &str, value: &str) -> Result<bool, FreshError> {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(FreshError::invalid_config(format!(
                "{} must be true or false",
                name
            ))),
        }
    }
}
