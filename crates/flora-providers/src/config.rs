//! Provider configuration loaded from the environment.
//!
//! Credentials are required; base URLs, timeout and request spacing fall
//! back to the values in `flora_core::defaults`. Empty strings and the
//! `YOUR_..._HERE` placeholders shipped in sample files count as missing.

use std::time::Duration;

use flora_core::defaults::{HTTP_TIMEOUT_SECS, PERMAPEOPLE_URL, REQUEST_INTERVAL_MS, TREFLE_URL};
use flora_core::{Error, Result};

pub const TREFLE_API_TOKEN: &str = "TREFLE_API_TOKEN";
pub const TREFLE_BASE_URL: &str = "TREFLE_BASE_URL";
pub const PERMAPEOPLE_KEY_ID: &str = "PERMAPEOPLE_KEY_ID";
pub const PERMAPEOPLE_KEY_SECRET: &str = "PERMAPEOPLE_KEY_SECRET";
pub const PERMAPEOPLE_BASE_URL: &str = "PERMAPEOPLE_BASE_URL";
pub const HTTP_TIMEOUT_VAR: &str = "FLORA_HTTP_TIMEOUT_SECS";
pub const REQUEST_INTERVAL_VAR: &str = "FLORA_REQUEST_INTERVAL_MS";

/// Configuration for the Trefle adapter.
#[derive(Clone)]
pub struct TrefleConfig {
    /// Base URL, without the `/api/v1` prefix.
    pub base_url: String,
    /// API token sent as the `token` query parameter.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TrefleConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: TREFLE_URL.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`, which returns the raw value of a variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = required(&lookup, TREFLE_API_TOKEN)?;
        Ok(Self {
            base_url: optional(&lookup, TREFLE_BASE_URL).unwrap_or_else(|| TREFLE_URL.to_string()),
            token,
            timeout: timeout_from(&lookup)?,
        })
    }
}

impl std::fmt::Debug for TrefleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrefleConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for the Permapeople adapter.
#[derive(Clone)]
pub struct PermapeopleConfig {
    pub base_url: String,
    /// Sent as `x-permapeople-key-id`.
    pub key_id: String,
    /// Sent as `x-permapeople-key-secret`.
    pub key_secret: String,
    pub timeout: Duration,
}

impl PermapeopleConfig {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            base_url: PERMAPEOPLE_URL.to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key_id = required(&lookup, PERMAPEOPLE_KEY_ID)?;
        let key_secret = required(&lookup, PERMAPEOPLE_KEY_SECRET)?;
        Ok(Self {
            base_url: optional(&lookup, PERMAPEOPLE_BASE_URL)
                .unwrap_or_else(|| PERMAPEOPLE_URL.to_string()),
            key_id,
            key_secret,
            timeout: timeout_from(&lookup)?,
        })
    }
}

impl std::fmt::Debug for PermapeopleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermapeopleConfig")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Spacing between successive provider queries.
pub fn request_interval_from_env() -> Result<Duration> {
    request_interval_from(&|name: &str| std::env::var(name).ok())
}

pub fn request_interval_from(lookup: &impl Fn(&str) -> Option<String>) -> Result<Duration> {
    let millis = parse_number(lookup, REQUEST_INTERVAL_VAR)?.unwrap_or(REQUEST_INTERVAL_MS);
    Ok(Duration::from_millis(millis))
}

fn timeout_from(lookup: &impl Fn(&str) -> Option<String>) -> Result<Duration> {
    let secs = parse_number(lookup, HTTP_TIMEOUT_VAR)?.unwrap_or(HTTP_TIMEOUT_SECS);
    Ok(Duration::from_secs(secs))
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    optional(lookup, name)
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| Error::Config(format!("{} must be a whole number, got '{}'", name, raw)))
        })
        .transpose()
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || (value.starts_with("YOUR_") && value.ends_with("_HERE"))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !is_placeholder(v))
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    optional(lookup, name).ok_or_else(|| Error::Config(format!("{} is not set", name)))
}
