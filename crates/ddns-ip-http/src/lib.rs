// # HTTP IP Discovery
//
// This crate provides an HTTP-based public IP discovery service for the
// DDNS supervisor.
//
// ## Architecture
//
// One GET per call against a service that answers with the caller's public
// IP as a plain-text body (e.g. api.ipify.org). No polling, caching or retry
// happens here: the update cycle decides when to ask and what to do with
// the answer.

use async_trait::async_trait;
use ddns_core::traits::IpDiscovery;
use ddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default discovery service
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// HTTP client timeout, matching the supervisor's outbound call timeout
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IP discovery
#[derive(Debug, Clone)]
pub struct HttpIpDiscovery {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpDiscovery {
    /// Create a new HTTP IP discovery
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Discovery against [`DEFAULT_IP_SERVICE`]
    pub fn ipify() -> Self {
        Self::new(DEFAULT_IP_SERVICE)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpIpDiscovery {
    fn default() -> Self {
        Self::ipify()
    }
}

#[async_trait]
impl IpDiscovery for HttpIpDiscovery {
    async fn public_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(describe_request_error(&e)))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        let ip = parse_ip_body(&body)?;
        tracing::debug!(url = %self.url, "Discovered public IP {}", ip);
        Ok(ip)
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// Parse a plain-text IP response body
pub fn parse_ip_body(body: &str) -> Result<IpAddr> {
    let text = body.trim();
    text.parse()
        .map_err(|_| Error::network(format!("Invalid IP address in response: '{}'", text)))
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout - check internet connection".to_string()
    } else if e.is_connect() {
        "connection failed - check internet connection".to_string()
    } else {
        format!("network error: {}", e)
    }
}
