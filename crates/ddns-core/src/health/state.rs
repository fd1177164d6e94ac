//! Shared health state
//!
//! Status, failure streak and a bounded FIFO of recent check outcomes, all
//! behind one `RwLock` so that a reader never sees a status without the log
//! entry that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Number of check outcomes kept in the health log
pub const HEALTH_LOG_CAPACITY: usize = 10;

/// Overall supervisor status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No check has completed yet
    Starting,
    /// The last check succeeded
    Healthy,
    /// The last check failed
    Unhealthy,
}

impl HealthStatus {
    /// Status as it appears in the health report
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Starting => "starting",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit classification of one check, serialized as `0` or `1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CheckOutcome {
    Success,
    Failure,
}

impl From<CheckOutcome> for u8 {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Success => 0,
            CheckOutcome::Failure => 1,
        }
    }
}

impl TryFrom<u8> for CheckOutcome {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CheckOutcome::Success),
            1 => Ok(CheckOutcome::Failure),
            other => Err(format!("invalid exit code: {other}")),
        }
    }
}

/// One record per update cycle invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckLogEntry {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exit_code: CheckOutcome,
    pub output: String,
}

impl CheckLogEntry {
    pub fn is_success(&self) -> bool {
        self.exit_code == CheckOutcome::Success
    }
}

/// Immutable copy of the health state, as served by `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub failing_streak: u32,
    /// Oldest first
    pub log: Vec<CheckLogEntry>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    /// Last public IP returned by discovery
    pub last_ip: Option<IpAddr>,
    /// When the DDNS record was last moved to a new IP
    pub last_change: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    /// HTTP status code for this snapshot: 503 when unhealthy, 200 otherwise
    pub fn http_status(&self) -> u16 {
        match self.status {
            HealthStatus::Unhealthy => 503,
            HealthStatus::Starting | HealthStatus::Healthy => 200,
        }
    }
}

/// Outcome of one cycle, applied to the state in a single critical section
#[derive(Debug, Clone)]
pub(crate) struct CheckReport {
    pub entry: CheckLogEntry,
    /// IP returned by discovery, if discovery succeeded
    pub observed_ip: Option<IpAddr>,
    /// Whether the DDNS record was moved to a new IP
    pub ip_changed: bool,
}

#[derive(Debug)]
struct HealthInner {
    status: HealthStatus,
    failing_streak: u32,
    log: VecDeque<CheckLogEntry>,
    last_ip: Option<IpAddr>,
    last_change: Option<DateTime<Utc>>,
}

/// Lock-protected health record
///
/// Written only by the update cycle; everybody else reads snapshots.
#[derive(Debug)]
pub struct HealthState {
    inner: RwLock<HealthInner>,
    started_at: DateTime<Utc>,
    capacity: usize,
}

impl HealthState {
    /// Create a state with the default log capacity
    pub fn new() -> Self {
        Self::with_capacity(HEALTH_LOG_CAPACITY)
    }

    /// Create a state keeping at most `capacity` log entries
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(HealthInner {
                status: HealthStatus::Starting,
                failing_streak: 0,
                log: VecDeque::with_capacity(capacity),
                last_ip: None,
                last_change: None,
            }),
            started_at: Utc::now(),
            capacity,
        }
    }

    /// Apply one check outcome
    ///
    /// Status, streak, log and last IP change together under the write lock.
    pub(crate) async fn record(&self, report: CheckReport) {
        let mut inner = self.inner.write().await;

        if report.entry.is_success() {
            inner.status = HealthStatus::Healthy;
            inner.failing_streak = 0;
        } else {
            inner.status = HealthStatus::Unhealthy;
            inner.failing_streak = inner.failing_streak.saturating_add(1);
        }

        if let Some(ip) = report.observed_ip {
            inner.last_ip = Some(ip);
        }
        if report.ip_changed {
            inner.last_change = Some(report.entry.end);
        }

        while inner.log.len() >= self.capacity {
            inner.log.pop_front();
        }
        inner.log.push_back(report.entry);
    }

    /// Copy the current state
    pub async fn snapshot(&self) -> HealthSnapshot {
        let inner = self.inner.read().await;
        let now = Utc::now();

        HealthSnapshot {
            status: inner.status,
            failing_streak: inner.failing_streak,
            log: inner.log.iter().cloned().collect(),
            started_at: self.started_at,
            uptime_secs: now
                .signed_duration_since(self.started_at)
                .num_seconds()
                .max(0) as u64,
            last_ip: inner.last_ip,
            last_change: inner.last_change,
        }
    }

    pub async fn status(&self) -> HealthStatus {
        self.inner.read().await.status
    }

    pub async fn failing_streak(&self) -> u32 {
        self.inner.read().await.failing_streak
    }

    pub async fn log_len(&self) -> usize {
        self.inner.read().await.log.len()
    }

    pub async fn last_change(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_change
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
