// # Health Listener Trait
//
// The HTTP side of the health endpoint lives outside the core. The
// reconfiguration controller only needs to start it on a port and stop it.

use async_trait::async_trait;

/// A restartable listener serving health snapshots
#[async_trait]
pub trait HealthListener: Send + Sync {
    /// Start listening on `port`
    ///
    /// Must return an error if the port cannot be bound; the caller treats
    /// that as fatal. Starting while already listening replaces nothing and
    /// should be avoided by the caller (the controller always stops first).
    async fn start(&self, port: u16) -> Result<(), crate::Error>;

    /// Stop listening and wait for the server task to finish
    ///
    /// Stopping a listener that is not running is a no-op.
    async fn stop(&self);
}
