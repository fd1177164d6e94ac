//! Read-only view of the health state
//!
//! The exporter is what the HTTP layer holds. It can only take snapshots;
//! the read lock is held for the duration of the copy and nothing else.

use std::sync::Arc;

use super::state::{HealthSnapshot, HealthState};

/// Read-only handle on the supervisor's [`HealthState`]
#[derive(Debug, Clone)]
pub struct HealthExporter {
    state: Arc<HealthState>,
}

impl HealthExporter {
    pub fn new(state: Arc<HealthState>) -> Self {
        Self { state }
    }

    /// Snapshot of the current health state
    pub async fn snapshot(&self) -> HealthSnapshot {
        self.state.snapshot().await
    }

    /// HTTP status code and body for `GET /health`
    pub async fn report(&self) -> (u16, HealthSnapshot) {
        let snapshot = self.snapshot().await;
        (snapshot.http_status(), snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::{CheckLogEntry, CheckOutcome, CheckReport, HealthStatus};
    use chrono::Utc;

    #[tokio::test]
    async fn report_follows_state() {
        let state = Arc::new(HealthState::new());
        let exporter = HealthExporter::new(state.clone());

        let (code, snapshot) = exporter.report().await;
        assert_eq!(code, 200);
        assert_eq!(snapshot.status, HealthStatus::Starting);

        let now = Utc::now();
        state
            .record(CheckReport {
                entry: CheckLogEntry {
                    start: now,
                    end: now,
                    exit_code: CheckOutcome::Failure,
                    output: "Network error: unreachable".to_string(),
                },
                observed_ip: None,
                ip_changed: false,
            })
            .await;

        let (code, snapshot) = exporter.report().await;
        assert_eq!(code, 503);
        assert_eq!(snapshot.failing_streak, 1);
        assert_eq!(snapshot.log.len(), 1);
    }

    #[tokio::test]
    async fn snapshots_are_independent_copies() {
        let state = Arc::new(HealthState::new());
        let exporter = HealthExporter::new(state);

        let first = exporter.snapshot().await;
        let second = exporter.snapshot().await;
        assert_eq!(first.log, second.log);
        assert_eq!(first.started_at, second.started_at);
    }
}
