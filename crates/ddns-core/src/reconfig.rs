//! Live reconfiguration
//!
//! The [`ReconfigurationController`] receives candidate configurations
//! (from a file watcher, or any other source) and decides what has to be
//! restarted:
//!
//! | Changed             | Action                                         |
//! |---------------------|------------------------------------------------|
//! | `interval`          | restart the scheduler                          |
//! | `health_port`       | restart the health listener                    |
//! | credentials/target  | swap config, invalidate cache, check now       |
//! | nothing             | no-op                                          |
//! | invalid candidate   | rejected, previous config stays in force       |
//!
//! Components whose dimension did not change are left alone, so an
//! in-flight check, the cached IP and the health log survive a reload.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::config::{ConfigDiff, Configuration, SharedConfig};
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::traits::HealthListener;

/// Result of handling one candidate configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The candidate is now active; the diff tells what was restarted
    Applied(ConfigDiff),

    /// The candidate equals the active configuration
    Unchanged,

    /// The candidate could not be loaded or failed validation
    Rejected,
}

struct ControllerState {
    /// Port the health listener is bound to, if it is running
    listener_port: Option<u16>,
}

/// Applies configuration snapshots to the running supervisor
pub struct ReconfigurationController {
    config: SharedConfig,
    scheduler: Arc<Scheduler>,
    listener: Arc<dyn HealthListener>,
    /// Serializes bootstrap/apply/shutdown
    state: Mutex<ControllerState>,
}

impl ReconfigurationController {
    /// Create a new controller
    ///
    /// # Parameters
    ///
    /// - `config`: the active configuration slot shared with the update cycle
    /// - `scheduler`: the scheduler driving the update cycle
    /// - `listener`: the health listener
    pub fn new(
        config: SharedConfig,
        scheduler: Arc<Scheduler>,
        listener: Arc<dyn HealthListener>,
    ) -> Self {
        Self {
            config,
            scheduler,
            listener,
            state: Mutex::new(ControllerState {
                listener_port: None,
            }),
        }
    }

    /// Apply the configuration loaded at startup
    ///
    /// The health listener always starts (on the candidate's port) so that
    /// the `starting` status is observable. If the candidate is invalid the
    /// scheduler is not started; a later valid reload starts it.
    ///
    /// # Errors
    ///
    /// Only a health listener that cannot bind is an error here.
    pub async fn bootstrap(&self, candidate: Configuration) -> Result<()> {
        let mut state = self.state.lock().await;

        self.listener.start(candidate.health_port).await?;
        state.listener_port = Some(candidate.health_port);
        info!(port = candidate.health_port, "Health listener started");

        match candidate.validate() {
            Ok(()) => {
                let interval = candidate.interval();
                *self.config.write().await = Some(candidate);
                info!("Config loaded successfully");
                self.scheduler.start(interval).await;
            }
            Err(e) => {
                warn!("{}. Waiting for valid config...", e);
            }
        }

        Ok(())
    }

    /// Handle one candidate configuration
    ///
    /// Load errors and validation failures are logged and reported as
    /// [`ReloadOutcome::Rejected`]; the active configuration is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only when the health listener cannot be restarted
    /// on a new port, which the daemon treats as fatal.
    pub async fn apply(&self, candidate: Result<Configuration>) -> Result<ReloadOutcome> {
        let candidate = match candidate {
            Ok(candidate) => candidate,
            Err(e) => {
                error!("{} - keeping previous valid config", e);
                return Ok(ReloadOutcome::Rejected);
            }
        };

        if let Err(e) = candidate.validate() {
            warn!("{} - keeping previous valid config", e);
            return Ok(ReloadOutcome::Rejected);
        }

        let mut state = self.state.lock().await;

        let active = self.config.read().await.clone();
        let diff = match &active {
            Some(active) => active.diff(&candidate),
            // First valid configuration after an invalid start
            None => ConfigDiff {
                interval: true,
                health_port: state.listener_port != Some(candidate.health_port),
                target: true,
            },
        };

        if diff.is_empty() {
            info!("Config file saved but no changes detected");
            return Ok(ReloadOutcome::Unchanged);
        }

        let interval = candidate.interval();
        let port = candidate.health_port;
        {
            let mut active = self.config.write().await;
            *active = Some(candidate);
            if diff.target {
                self.scheduler.cycle().invalidate_cache().await;
            }
        }

        if diff.health_port {
            info!(port, "Health port changed, restarting health listener");
            self.listener.stop().await;
            state.listener_port = None;
            self.listener.start(port).await?;
            state.listener_port = Some(port);
        }

        if diff.interval || !self.scheduler.is_running().await {
            info!("Config changed, restarting IP checker");
            self.scheduler.restart(interval).await;
        } else if diff.target {
            // A restart checks immediately; without one, ask the loop for a
            // check so the new target does not wait a full interval.
            self.scheduler.check_now().await;
        }

        info!(
            interval = diff.interval,
            health_port = diff.health_port,
            target = diff.target,
            "Config changed and reloaded"
        );
        Ok(ReloadOutcome::Applied(diff))
    }

    /// Consume candidate configurations until `shutdown` resolves
    ///
    /// The scheduler and the health listener are stopped before returning,
    /// whether the exit is a shutdown or a fatal listener error.
    pub async fn run<S, F>(&self, events: S, shutdown: F) -> Result<()>
    where
        S: Stream<Item = Result<Configuration>> + Send,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(events);
        tokio::pin!(shutdown);

        let mut events_open = true;
        let result = loop {
            tokio::select! {
                event = events.next(), if events_open => match event {
                    Some(candidate) => {
                        if let Err(e) = self.apply(candidate).await {
                            error!("Fatal reconfiguration error: {}", e);
                            break Err(e);
                        }
                    }
                    None => {
                        warn!("Config event stream closed, live reload disabled");
                        events_open = false;
                    }
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        self.shutdown().await;
        result
    }

    /// Stop the scheduler and the health listener
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        self.scheduler.stop().await;
        self.listener.stop().await;
        state.listener_port = None;
        info!("Supervisor stopped");
    }

    /// The configuration currently in force
    pub async fn active_config(&self) -> Option<Configuration> {
        self.config.read().await.clone()
    }

    /// Port the health listener is bound to
    pub async fn listener_port(&self) -> Option<u16> {
        self.state.lock().await.listener_port
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}
