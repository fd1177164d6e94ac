//! Configuration types for the DDNS supervisor
//!
//! A [`Configuration`] is an immutable snapshot loaded from a JSON file:
//!
//! ```json
//! {
//!   "user": "alice",
//!   "pass": "secret",
//!   "ddns": "members.dyndns.org/nic/update",
//!   "interval": 300,
//!   "health_port": 8080
//! }
//! ```
//!
//! Loading is split in two steps. [`Configuration::from_file`] reads, parses
//! and normalizes; [`Configuration::validate`] checks the required fields.
//! The split lets the daemon treat read/parse failures as fatal at startup
//! while a validation failure only parks the supervisor until a valid file
//! shows up.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Default poll interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Smallest accepted poll interval in seconds
///
/// Anything below is replaced with [`DEFAULT_INTERVAL_SECS`], not rejected.
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Default port of the health listener
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Active configuration shared between the reload path and the update cycle
///
/// `None` until a valid configuration has been accepted.
pub type SharedConfig = Arc<RwLock<Option<Configuration>>>;

/// Supervisor configuration snapshot
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// DDNS account user name
    #[serde(default)]
    pub user: String,

    /// DDNS account password
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub pass: String,

    /// Update endpoint host and path (e.g. "members.dyndns.org/nic/update")
    #[serde(default)]
    pub ddns: String,

    /// Poll interval in seconds
    #[serde(default = "default_interval", deserialize_with = "deserialize_interval")]
    pub interval: u64,

    /// Port the health endpoint listens on
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("user", &self.user)
            .field("pass", &redact(&self.pass))
            .field("ddns", &self.ddns)
            .field("interval", &self.interval)
            .field("health_port", &self.health_port)
            .finish()
    }
}

impl Configuration {
    /// Create a configuration with default interval and health port
    pub fn new(user: impl Into<String>, pass: impl Into<String>, ddns: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
            ddns: ddns.into(),
            interval: DEFAULT_INTERVAL_SECS,
            health_port: DEFAULT_HEALTH_PORT,
        }
    }

    /// Set the poll interval (normalized)
    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval = interval_secs;
        self.normalize()
    }

    /// Set the health listener port
    pub fn with_health_port(mut self, port: u16) -> Self {
        self.health_port = port;
        self
    }

    /// Parse a configuration from JSON text and normalize it
    ///
    /// The result is not validated; call [`Configuration::validate`].
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Configuration = serde_json::from_str(text)?;
        Ok(config.normalize())
    }

    /// Read, parse and normalize a configuration file
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigRead`] if the file cannot be read
    /// - [`Error::ConfigParse`] if the content is not valid JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Replace an interval below the floor with the default
    pub fn normalize(mut self) -> Self {
        if self.interval < MIN_INTERVAL_SECS {
            self.interval = DEFAULT_INTERVAL_SECS;
        }
        self
    }

    /// Validate the required fields
    ///
    /// The error message names every missing field; the password is only
    /// ever reported as set or empty.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.user.is_empty() {
            missing.push("user");
        }
        if self.pass.is_empty() {
            missing.push("pass");
        }
        if self.ddns.is_empty() {
            missing.push("ddns");
        }

        if missing.is_empty() {
            return Ok(());
        }

        Err(Error::validation(format!(
            "missing {} (user: '{}', pass: '{}', ddns: '{}')",
            missing.join(", "),
            or_empty(&self.user),
            redact(&self.pass),
            or_empty(&self.ddns),
        )))
    }

    /// Poll interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Compute what changed between `self` (active) and `candidate`
    pub fn diff(&self, candidate: &Configuration) -> ConfigDiff {
        ConfigDiff {
            interval: self.interval != candidate.interval,
            health_port: self.health_port != candidate.health_port,
            target: self.user != candidate.user
                || self.pass != candidate.pass
                || self.ddns != candidate.ddns,
        }
    }
}

/// Dimensions that differ between two configurations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// Poll interval changed: the scheduler must restart
    pub interval: bool,

    /// Health port changed: the health listener must restart
    pub health_port: bool,

    /// Credentials or DDNS target changed: the cached IP no longer describes
    /// what the active target has received
    pub target: bool,
}

impl ConfigDiff {
    /// Whether anything changed at all
    pub fn is_empty(&self) -> bool {
        !self.interval && !self.health_port && !self.target
    }
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

/// Accept any JSON integer; negatives map to 0 and are normalized later
fn deserialize_interval<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawInterval {
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawInterval::deserialize(deserializer)? {
        RawInterval::Unsigned(secs) => secs,
        RawInterval::Signed(secs) => u64::try_from(secs).unwrap_or(0),
    })
}

fn default_health_port() -> u16 {
    DEFAULT_HEALTH_PORT
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<empty>" } else { "<set>" }
}

fn or_empty(value: &str) -> &str {
    if value.is_empty() { "<empty>" } else { value }
}
