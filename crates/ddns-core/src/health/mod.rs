// # Health Reporting
//
// `HealthState` is written by the update cycle and read by the exporter.
// The HTTP side (serving `GET /health`) lives in the daemon.

pub mod exporter;
pub mod state;

pub use exporter::HealthExporter;
pub use state::{
    CheckLogEntry, CheckOutcome, HEALTH_LOG_CAPACITY, HealthSnapshot, HealthState, HealthStatus,
};
