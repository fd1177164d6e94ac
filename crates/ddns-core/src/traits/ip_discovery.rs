// # IP Discovery Trait
//
// Defines the interface for asking an external service which public IP
// address the host currently has.
//
// ## Implementations
//
// - HTTP (plain-text body, e.g. api.ipify.org): `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpDiscovery;
//
// let discovery = /* IpDiscovery implementation */;
// let ip = discovery.public_ip().await?;
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public IP discovery implementations
///
/// One call, one outbound request. Implementations must not retry or cache:
/// the [`UpdateCycle`](crate::cycle::UpdateCycle) owns the cadence and the
/// comparison with the cached IP, and applies the outbound timeout.
///
/// Any failure (unreachable service, non-success status, body that is not an
/// IP address) is reported as an error; the cycle classifies it as a network
/// error.
#[async_trait]
pub trait IpDiscovery: Send + Sync {
    /// Fetch the current public IP address
    async fn public_ip(&self) -> Result<IpAddr, crate::Error>;

    /// Name of the discovery service (for logging)
    fn name(&self) -> &str;
}
