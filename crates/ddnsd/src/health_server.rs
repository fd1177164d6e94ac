//! Health endpoint over HTTP
//!
//! Serves `GET /health` from a [`HealthExporter`]: 200 while starting or
//! healthy, 503 when unhealthy, JSON snapshot as body. The server can be
//! stopped and started again on another port by the reconfiguration
//! controller.

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use ddns_core::health::HealthSnapshot;
use ddns_core::traits::HealthListener;
use ddns_core::{Error, HealthExporter};
use std::net::SocketAddr;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// axum-based [`HealthListener`]
pub struct AxumHealthListener {
    exporter: HealthExporter,
    running: Mutex<Option<RunningServer>>,
}

impl AxumHealthListener {
    pub fn new(exporter: HealthExporter) -> Self {
        Self {
            exporter,
            running: Mutex::new(None),
        }
    }

    /// Address actually bound (useful when started on port 0)
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|server| server.addr)
    }

    async fn shutdown_server(server: RunningServer) {
        let _ = server.shutdown_tx.send(());
        if let Err(e) = server.handle.await {
            error!("Health server task failed: {}", e);
        }
        info!(address = %server.addr, "Health server stopped");
    }
}

/// Router serving `GET /health`
pub fn router(exporter: HealthExporter) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(exporter)
}

async fn health(State(exporter): State<HealthExporter>) -> (StatusCode, Json<HealthSnapshot>) {
    let (code, snapshot) = exporter.report().await;
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(snapshot))
}

#[async_trait]
impl HealthListener for AxumHealthListener {
    async fn start(&self, port: u16) -> ddns_core::Result<()> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.take() {
            Self::shutdown_server(server).await;
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::listener(format!("failed to bind {}: {}", addr, e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::listener(format!("failed to read bound address: {}", e)))?;

        let app = router(self.exporter.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                error!("Health server error: {}", e);
            }
        });

        info!(address = %addr, "Health server started");
        *running = Some(RunningServer {
            addr,
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    async fn stop(&self) {
        let server = self.running.lock().await.take();
        if let Some(server) = server {
            Self::shutdown_server(server).await;
        }
    }
}
