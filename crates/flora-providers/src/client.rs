//! Thin HTTP client shared by the provider adapters.
//!
//! Treats any non-success status as a request error and an empty body as
//! "nothing here". Request URLs are never logged or embedded in errors
//! because Trefle carries its token in the query string.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, trace, warn};

use flora_core::{Error, Provider, Result};

/// HTTP client bound to one provider's base URL.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    provider: Provider,
}

impl ProviderClient {
    pub fn new(provider: Provider, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}{path}`.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    /// POST `{base_url}{path}`.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(format!("{}{}", self.base_url, path))
    }

    /// Send `request` and decode its JSON body.
    ///
    /// `path` is used for logs and error messages only. Returns `Ok(None)`
    /// for an empty body or a literal JSON `null`.
    pub async fn send_json(&self, request: RequestBuilder, path: &str) -> Result<Option<Value>> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            Error::Request(format!(
                "{} {} failed: {}",
                self.provider,
                path,
                e.without_url()
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                subsystem = "providers",
                component = %self.provider,
                op = "http",
                path = path,
                http_status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Provider returned non-success status"
            );
            return Err(Error::Request(format!(
                "{} {} returned HTTP {}",
                self.provider, path, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::Request(format!(
                "{} {} body could not be read: {}",
                self.provider,
                path,
                e.without_url()
            ))
        })?;
        debug!(
            subsystem = "providers",
            component = %self.provider,
            op = "http",
            path = path,
            http_status = status.as_u16(),
            body_len = body.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Provider response received"
        );

        if body.trim().is_empty() {
            trace!(path = path, "Empty response body");
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&body).map_err(|e| {
            Error::Serialization(format!(
                "{} {} returned invalid JSON: {}",
                self.provider, path, e
            ))
        })?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}
