//! Configuration file watcher for live reload.
//!
//! Watches the directory holding the config file, so editors that replace
//! the file (write to temp + rename) are seen too. Every relevant event
//! reloads the file and forwards the result, success or failure; the
//! reconfiguration controller decides what to do with it.

use ddns_core::{Configuration, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Delay before retrying a watch that could not be established
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(10);

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Result<Configuration>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for reloaded configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Result<Configuration>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching; the returned handle must be kept alive.
    pub fn watch(&self) -> notify::Result<RecommendedWatcher> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|name| name.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant && ours {
                        info!("Config file modified");
                        let _ = tx.send(Configuration::from_file(&path));
                    }
                }
                Err(e) => error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;

        watcher.watch(watch_root(&self.path), RecursiveMode::NonRecursive)?;

        info!(path = ?self.path, "Watching config file for changes...");
        Ok(watcher)
    }

    /// Keep trying to establish the watch until it succeeds.
    pub async fn watch_with_retry(&self) -> RecommendedWatcher {
        loop {
            match self.watch() {
                Ok(watcher) => return watcher,
                Err(e) => {
                    warn!(
                        "Failed to watch config: {}. Retrying in {} seconds...",
                        e,
                        WATCH_RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(WATCH_RETRY_DELAY).await;
                }
            }
        }
    }
}

fn watch_root(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
