// # dyndns2 Update Provider
//
// This crate pushes IP changes to DDNS services speaking the dyndns2-style
// protocol: a single authenticated GET carrying the new address.
//
// ```http
// GET https://<user>:<pass>@<ddns>?myip=<ip>
// ```
//
// reqwest moves the URL userinfo into a basic `Authorization` header, so the
// credentials do not travel in the request line.
//
// ## Rules
//
// - One HTTP request per call
// - No retry logic (the supervisor retries on its next tick)
// - Any non-success status is a failure
// - Credentials NEVER appear in logs or error messages

use async_trait::async_trait;
use ddns_core::config::Configuration;
use ddns_core::traits::DdnsUpdater;
use ddns_core::{Error, Result};
use reqwest::{StatusCode, Url};
use std::net::IpAddr;
use std::time::Duration;

/// HTTP timeout for update requests, matching the supervisor's outbound timeout
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// dyndns2-style update client
///
/// Holds no credentials: they come from the active configuration on every
/// call, so a reload takes effect without rebuilding the provider.
#[derive(Debug, Clone)]
pub struct DynDnsUpdater {
    client: reqwest::Client,
}

impl DynDnsUpdater {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for DynDnsUpdater {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DdnsUpdater for DynDnsUpdater {
    async fn push_update(&self, config: &Configuration, ip: IpAddr) -> Result<()> {
        let url = build_update_url(config, ip)?;
        tracing::debug!(url = %redact_url(&url), "Sending DDNS update");

        let response = self.client.get(url).send().await.map_err(|e| {
            Error::update(if e.is_timeout() {
                "timeout - check internet connection".to_string()
            } else if e.is_connect() {
                "connection failed - check ddns provider".to_string()
            } else {
                // Without the URL: it carries the credentials
                format!("request error: {}", e.without_url())
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::update(describe_status(status)));
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "dyndns"
    }
}

/// Build `https://<user>:<pass>@<ddns>?myip=<ip>`
///
/// `ddns` may already carry an `http://` or `https://` scheme; otherwise
/// HTTPS is assumed. Credentials are percent-encoded.
pub fn build_update_url(config: &Configuration, ip: IpAddr) -> Result<Url> {
    let target = config.ddns.trim();
    let with_scheme = if target.starts_with("https://") || target.starts_with("http://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| Error::update(format!("Invalid ddns target '{}': {}", target, e)))?;

    url.set_username(&config.user)
        .map_err(|_| Error::update(format!("ddns target '{}' cannot carry credentials", target)))?;
    url.set_password(Some(&config.pass))
        .map_err(|_| Error::update(format!("ddns target '{}' cannot carry credentials", target)))?;
    url.query_pairs_mut().append_pair("myip", &ip.to_string());

    Ok(url)
}

/// Copy of `url` safe for logging
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    if redacted.password().is_some() {
        let _ = redacted.set_password(Some("REDACTED"));
    }
    redacted.to_string()
}

/// Human-readable failure for a non-success status, with a hint
fn describe_status(status: StatusCode) -> String {
    let base = format!(
        "status: {} ({})",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    match status.as_u16() {
        401 | 403 => format!("{} - authentication failed, check user/pass in config", base),
        404 => format!("{} - DDNS provider not found, check ddns URL in config", base),
        _ => base,
    }
}
