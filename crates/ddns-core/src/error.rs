//! Error types for the DDNS supervisor
//!
//! Configuration errors split into read, parse and validation failures so the
//! caller can decide what is fatal (startup) and what is only logged (reload).
//! Cycle-level errors (`Network`, `Update`) never leave the supervisor: they
//! are recorded in the health log and the loop keeps going.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS supervisor
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file missing or unreadable
    #[error("Config read error: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Configuration file is not valid JSON for the expected shape
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A required configuration field is empty
    #[error("Invalid config: {0}")]
    ConfigValidation(String),

    /// Public IP discovery failed
    #[error("Network error: {0}")]
    Network(String),

    /// Pushing the new IP to the DDNS provider failed
    #[error("Update error: {0}")]
    Update(String),

    /// The health listener could not be established
    #[error("Health listener error: {0}")]
    Listener(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a network (IP discovery) error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an update (DDNS push) error
    pub fn update(msg: impl Into<String>) -> Self {
        Self::Update(msg.into())
    }

    /// Create a health listener error
    pub fn listener(msg: impl Into<String>) -> Self {
        Self::Listener(msg.into())
    }

    /// Whether this error comes from loading or validating configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigRead(_) | Self::ConfigParse(_) | Self::ConfigValidation(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
