//! Collaborator traits for the DDNS supervisor
//!
//! The supervisor talks to the outside world only through these interfaces:
//!
//! - [`IpDiscovery`]: ask an external service for the public IP
//! - [`DdnsUpdater`]: push a new IP to the DDNS provider
//! - [`HealthListener`]: serve health snapshots over the network

pub mod ddns_updater;
pub mod health_listener;
pub mod ip_discovery;

pub use ddns_updater::DdnsUpdater;
pub use health_listener::HealthListener;
pub use ip_discovery::IpDiscovery;
