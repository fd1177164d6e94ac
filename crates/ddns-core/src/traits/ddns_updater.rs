// # DDNS Updater Trait
//
// Defines the interface for pushing a new IP address to the DDNS provider.
//
// ## Implementations
//
// - dyndns2-style GET with credentials in the URL: `ddns-provider-dyndns` crate

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::Configuration;

/// Trait for DDNS update implementations
///
/// The updater receives the active [`Configuration`] on every call, so a
/// reload that changes credentials or the target takes effect on the next
/// tick without rebuilding the updater.
///
/// # Rules
///
/// - Single-shot: one request per call, no retry, no backoff
/// - Stateless: whether an update is needed is decided by the caller
/// - Credentials never appear in logs or error messages
#[async_trait]
pub trait DdnsUpdater: Send + Sync {
    /// Point the configured DDNS record at `ip`
    async fn push_update(&self, config: &Configuration, ip: IpAddr) -> Result<(), crate::Error>;

    /// Name of the provider (for logging)
    fn provider_name(&self) -> &'static str;
}
