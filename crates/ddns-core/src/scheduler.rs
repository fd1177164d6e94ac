//! Periodic execution of the update cycle
//!
//! ## Lifecycle
//!
//! ```text
//!  start(interval) ──► spawn loop ──► run cycle immediately
//!                                      │
//!                          ┌───────────┴───────────┐
//!                          ▼                       ▼
//!                    tick: run cycle        cancel signal: exit
//!  check_now() ──► wake the loop for an extra check (no restart)
//!  stop() ──► send cancel, wait for the loop task to exit
//!  restart(interval) ──► stop() + start(interval) under one lock
//! ```
//!
//! Cancellation is cooperative. The loop only listens for the signal while
//! it waits for the next tick, so a check that is already running always
//! completes and gets recorded.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::MIN_INTERVAL_SECS;
use crate::cycle::UpdateCycle;

/// Handle on the currently running loop
struct RunningLoop {
    interval: Duration,
    cancel_tx: oneshot::Sender<()>,
    check_now: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Owns the periodic loop driving an [`UpdateCycle`]
///
/// At most one loop instance exists at a time: `start` on a running
/// scheduler is a no-op, and `stop` waits until the loop task has exited.
pub struct Scheduler {
    cycle: Arc<UpdateCycle>,
    running: Mutex<Option<RunningLoop>>,
}

impl Scheduler {
    pub fn new(cycle: Arc<UpdateCycle>) -> Self {
        Self {
            cycle,
            running: Mutex::new(None),
        }
    }

    /// The cycle this scheduler drives
    pub fn cycle(&self) -> &Arc<UpdateCycle> {
        &self.cycle
    }

    /// Start the loop with the given interval
    ///
    /// Returns `false` without doing anything if a loop is already running.
    pub async fn start(&self, interval: Duration) -> bool {
        let mut running = self.running.lock().await;
        self.start_locked(&mut running, interval)
    }

    /// Stop the loop and wait for it to exit
    ///
    /// Returns `false` if nothing was running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        Self::stop_locked(&mut running).await
    }

    /// Stop the current loop (if any) and start a fresh one
    ///
    /// The new loop runs its first check immediately.
    pub async fn restart(&self, interval: Duration) {
        let mut running = self.running.lock().await;
        if Self::stop_locked(&mut running).await {
            info!("Restarting IP checker with interval {:?}", interval);
        }
        self.start_locked(&mut running, interval);
    }

    /// Ask the running loop for one extra check
    ///
    /// The check runs on the loop task, after any check already in flight,
    /// and does not move the tick schedule. Returns `false` if nothing is
    /// running.
    pub async fn check_now(&self) -> bool {
        let running = self.running.lock().await;
        match running.as_ref() {
            Some(active) if !active.handle.is_finished() => {
                active.check_now.notify_one();
                true
            }
            _ => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Interval of the running loop
    pub async fn interval(&self) -> Option<Duration> {
        self.running
            .lock()
            .await
            .as_ref()
            .filter(|active| !active.handle.is_finished())
            .map(|active| active.interval)
    }

    fn start_locked(&self, running: &mut Option<RunningLoop>, interval: Duration) -> bool {
        if let Some(active) = running.as_ref()
            && !active.handle.is_finished()
        {
            debug!("IP checker already running, ignoring start");
            return false;
        }

        let interval = if interval.is_zero() {
            warn!(
                "Zero interval requested, using {}s instead",
                MIN_INTERVAL_SECS
            );
            Duration::from_secs(MIN_INTERVAL_SECS)
        } else {
            interval
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let check_now = Arc::new(Notify::new());
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.cycle),
            interval,
            cancel_rx,
            Arc::clone(&check_now),
        ));

        *running = Some(RunningLoop {
            interval,
            cancel_tx,
            check_now,
            handle,
        });

        info!("IP checker started (interval={:?})", interval);
        true
    }

    async fn stop_locked(running: &mut Option<RunningLoop>) -> bool {
        let Some(active) = running.take() else {
            return false;
        };

        // The loop may already be gone (panicked); a closed channel is fine.
        let _ = active.cancel_tx.send(());

        if let Err(e) = active.handle.await {
            if e.is_panic() {
                error!("IP checker task panicked: {}", e);
            }
        }

        info!("IP checker stopped");
        true
    }
}

/// The periodic loop
///
/// The first tick of a tokio interval completes immediately, which gives the
/// "check at start" behavior for free.
async fn run_loop(
    cycle: Arc<UpdateCycle>,
    interval: Duration,
    mut cancel_rx: oneshot::Receiver<()>,
    check_now: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = &mut cancel_rx => {
                debug!("IP checker received stop signal");
                break;
            }

            _ = ticker.tick() => {
                // Errors are already recorded in the health log.
                let _ = cycle.run().await;
            }

            _ = check_now.notified() => {
                debug!("IP checker woken for an extra check");
                let _ = cycle.run().await;
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}
