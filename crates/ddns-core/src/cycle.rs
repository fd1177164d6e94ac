//! One check-and-update attempt
//!
//! ## Flow
//!
//! ```text
//! IpDiscovery::public_ip() ──► compare with cached IP ──► DdnsUpdater::push_update()
//!          │                          │ equal                      │
//!          ▼ error                    ▼                            ▼ ok / error
//!     NetworkError              "IP unchanged"             cache IP / UpdateError
//!          └──────────────────────────┴────────────────────────────┘
//!                                     │
//!                                     ▼
//!                    HealthState::record() (one log entry per run)
//! ```
//!
//! Every outbound call is bounded by the same timeout. There is no retry
//! here: a failed run leaves the cached IP alone and the next tick tries
//! again.

use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{Configuration, SharedConfig};
use crate::error::{Error, Result};
use crate::health::state::{CheckLogEntry, CheckOutcome, CheckReport, HealthState};
use crate::traits::{DdnsUpdater, IpDiscovery};

/// Timeout applied to every outbound call
pub const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Successful result of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Discovered IP matches the cached one; no update was sent
    Unchanged { ip: IpAddr },

    /// The DDNS record now points at `new_ip`
    Updated {
        previous_ip: Option<IpAddr>,
        new_ip: IpAddr,
    },
}

/// The check-and-update unit invoked by the scheduler
///
/// Owns the cached IP. The cache survives scheduler restarts because the
/// scheduler holds the cycle behind an `Arc` and only replaces its loop.
pub struct UpdateCycle {
    discovery: Arc<dyn IpDiscovery>,
    updater: Arc<dyn DdnsUpdater>,
    config: SharedConfig,
    health: Arc<HealthState>,
    cached_ip: RwLock<Option<IpAddr>>,
    call_timeout: Duration,
}

impl UpdateCycle {
    /// Create a new update cycle
    ///
    /// # Parameters
    ///
    /// - `discovery`: public IP discovery service
    /// - `updater`: DDNS provider client
    /// - `config`: active configuration, read at the start of every run
    /// - `health`: health state this cycle reports into
    pub fn new(
        discovery: Arc<dyn IpDiscovery>,
        updater: Arc<dyn DdnsUpdater>,
        config: SharedConfig,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            discovery,
            updater,
            config,
            health,
            cached_ip: RwLock::new(None),
            call_timeout: OUTBOUND_TIMEOUT,
        }
    }

    /// Override the outbound call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run one check-and-update attempt and record it
    ///
    /// The returned error is informational: it has already been written to
    /// the health log, and callers (the scheduler loop) just carry on.
    pub async fn run(&self) -> Result<CycleOutcome> {
        let start = Utc::now();
        let mut observed_ip = None;
        let result = self.check(&mut observed_ip).await;
        let end = Utc::now();

        let (exit_code, output) = match &result {
            Ok(CycleOutcome::Unchanged { ip }) => {
                let output = match self.health.last_change().await {
                    Some(time) => format!(
                        "IP unchanged: {} (last changed {})",
                        ip,
                        time.format("%Y-%m-%d %H:%M:%S")
                    ),
                    None => format!("IP unchanged: {} (change time unknown)", ip),
                };
                info!("{}", output);
                (CheckOutcome::Success, output)
            }
            Ok(CycleOutcome::Updated { previous_ip, new_ip }) => {
                info!(previous = ?previous_ip, "DDNS updated successfully with IP: {}", new_ip);
                (
                    CheckOutcome::Success,
                    format!("DDNS updated successfully with IP: {}", new_ip),
                )
            }
            Err(e) => {
                error!("Check failed: {}", e);
                (CheckOutcome::Failure, e.to_string())
            }
        };

        self.health
            .record(CheckReport {
                entry: CheckLogEntry {
                    start,
                    end,
                    exit_code,
                    output,
                },
                observed_ip,
                ip_changed: matches!(result, Ok(CycleOutcome::Updated { .. })),
            })
            .await;

        result
    }

    /// Last IP successfully pushed to the DDNS provider
    pub async fn cached_ip(&self) -> Option<IpAddr> {
        *self.cached_ip.read().await
    }

    /// Forget the cached IP so the next run pushes unconditionally
    ///
    /// Lock order is config slot, then cache: call this while holding the
    /// config write guard.
    pub(crate) async fn invalidate_cache(&self) {
        let previous = self.cached_ip.write().await.take();
        debug!(previous = ?previous, "Cached IP invalidated");
    }

    /// Health state this cycle reports into
    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    async fn check(&self, observed_ip: &mut Option<IpAddr>) -> Result<CycleOutcome> {
        let config = self.active_config().await?;

        let ip = self.discover().await?;
        *observed_ip = Some(ip);

        let cached = self.cached_ip().await;
        if cached == Some(ip) {
            return Ok(CycleOutcome::Unchanged { ip });
        }

        info!("IP changed to: {} (cached: {:?})", ip, cached);
        self.push(&config, ip).await?;

        // A reload may have switched target while the push was in flight;
        // the cache only describes what the active target has received.
        // The config guard is held across the write so a reload cannot
        // slip in between the check and the cache update.
        let active = self.config.read().await;
        if active
            .as_ref()
            .is_some_and(|current| !config.diff(current).target)
        {
            *self.cached_ip.write().await = Some(ip);
        }
        drop(active);
        Ok(CycleOutcome::Updated {
            previous_ip: cached,
            new_ip: ip,
        })
    }

    async fn active_config(&self) -> Result<Configuration> {
        self.config
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Other("No valid config available".to_string()))
    }

    async fn discover(&self) -> Result<IpAddr> {
        match tokio::time::timeout(self.call_timeout, self.discovery.public_ip()).await {
            Ok(Ok(ip)) => Ok(ip),
            Ok(Err(Error::Network(msg))) => Err(Error::Network(msg)),
            Ok(Err(e)) => Err(Error::network(e.to_string())),
            Err(_) => {
                warn!(
                    "IP discovery via {} timed out - will retry at next interval",
                    self.discovery.name()
                );
                Err(Error::network(format!(
                    "{} timed out after {:?}",
                    self.discovery.name(),
                    self.call_timeout
                )))
            }
        }
    }

    async fn push(&self, config: &Configuration, ip: IpAddr) -> Result<()> {
        match tokio::time::timeout(self.call_timeout, self.updater.push_update(config, ip)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(Error::Update(msg))) => Err(Error::Update(msg)),
            Ok(Err(e)) => Err(Error::update(e.to_string())),
            Err(_) => Err(Error::update(format!(
                "{} update timed out after {:?}",
                self.updater.provider_name(),
                self.call_timeout
            ))),
        }
    }
}

impl std::fmt::Debug for UpdateCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCycle")
            .field("discovery", &self.discovery.name())
            .field("updater", &self.updater.provider_name())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
