// # ddnsd - DDNS Supervisor Daemon
//
// Thin integration layer: reads environment settings, loads the initial
// config file, wires the HTTP IP discovery, the DynDNS updater and the
// axum health listener into the ddns-core supervisor, then hands control
// to the reconfiguration controller until a shutdown signal arrives.
//
// ## Environment
//
// - `DDNS_CONFIG_PATH`: config file to load and watch (default `config/config.json`)
// - `DDNS_IP_SOURCE_URL`: public IP service (default `https://api.ipify.org`)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default `info`)
//
// ## Example
//
// ```bash
// export DDNS_CONFIG_PATH=/etc/ddns/config.json
// ddnsd
// ```

mod health_server;
mod watcher;

use anyhow::Result;
use ddns_core::{
    Configuration, HealthExporter, HealthState, ReconfigurationController, Scheduler,
    SharedConfig, UpdateCycle,
};
use ddns_ip_http::{DEFAULT_IP_SERVICE, HttpIpDiscovery};
use ddns_provider_dyndns::DynDnsUpdater;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::health_server::AxumHealthListener;
use crate::watcher::ConfigWatcher;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process-level settings, separate from the reloadable config file
struct Settings {
    config_path: PathBuf,
    ip_source_url: String,
    log_level: String,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Self {
        Self {
            config_path: env::var("DDNS_CONFIG_PATH")
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            ip_source_url: env::var("DDNS_IP_SOURCE_URL")
                .unwrap_or_else(|_| DEFAULT_IP_SERVICE.to_string()),
            log_level: env::var("DDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.config_path.as_os_str().is_empty() {
            anyhow::bail!("DDNS_CONFIG_PATH cannot be empty");
        }

        if !self.ip_source_url.starts_with("https://") && !self.ip_source_url.starts_with("http://")
        {
            anyhow::bail!(
                "DDNS_IP_SOURCE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip_source_url
            );
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let settings = Settings::from_env();

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = settings.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    if settings.ip_source_url.starts_with("http://") {
        warn!("DDNS_IP_SOURCE_URL uses HTTP (not HTTPS). Consider using HTTPS.");
    }

    // Read/parse failures are fatal here; validation failures are not.
    let initial = match Configuration::from_file(&settings.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "Failed to load config {}: {}. Please fix the config file and restart.",
                settings.config_path.display(),
                e
            );
            return DdnsExitCode::ConfigError.into();
        }
    };
    info!(config = ?initial, "Initial config read");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(settings, initial).await {
            error!("Daemon error: {}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(settings: Settings, initial: Configuration) -> Result<()> {
    let config: SharedConfig = Arc::new(RwLock::new(None));
    let health = Arc::new(HealthState::new());

    let discovery = Arc::new(HttpIpDiscovery::new(settings.ip_source_url.clone()));
    let updater = Arc::new(DynDnsUpdater::new());
    let cycle = Arc::new(UpdateCycle::new(
        discovery,
        updater,
        Arc::clone(&config),
        Arc::clone(&health),
    ));
    let scheduler = Arc::new(Scheduler::new(cycle));
    let listener = Arc::new(AxumHealthListener::new(HealthExporter::new(health)));

    let controller = ReconfigurationController::new(config, scheduler, listener);
    controller.bootstrap(initial).await?;

    let (watcher, updates) = ConfigWatcher::new(&settings.config_path);
    let watch_task = tokio::spawn(async move {
        // Dropping the notify handle ends the watch
        let _handle = watcher.watch_with_retry().await;
        std::future::pending::<()>().await;
    });

    info!("Daemon initialized successfully");

    let result = controller
        .run(UnboundedReceiverStream::new(updates), async {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Shutdown error: {}", e),
            }
        })
        .await;

    watch_task.abort();
    result?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
