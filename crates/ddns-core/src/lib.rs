// # ddns-core
//
// Core library for the reconfigurable DDNS polling supervisor.
//
// ## Architecture Overview
//
// - **HealthState**: lock-protected status, failure streak and bounded log
// - **UpdateCycle**: one fetch-compare-push attempt, recorded in HealthState
// - **Scheduler**: cancellable periodic loop driving the UpdateCycle
// - **ReconfigurationController**: diffs configuration snapshots and
//   restarts only what depends on the changed fields
// - **HealthExporter**: read-only snapshots for the health endpoint
//
// ```text
// config loader ──► ReconfigurationController ──► Scheduler ──► UpdateCycle
//                          │                                        │
//                          ▼                                        ▼
//                   HealthListener ◄── HealthExporter ◄──────── HealthState
// ```
//
// ## Design Principles
//
// 1. **Explicit state**: everything shared is injected at construction
// 2. **Recover by cadence**: failed checks are recorded, the next tick retries
// 3. **Minimal disturbance**: a reload restarts only the affected component
// 4. **Library-First**: the daemon is a thin layer over this crate

pub mod config;
pub mod cycle;
pub mod error;
pub mod health;
pub mod reconfig;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{ConfigDiff, Configuration, SharedConfig};
pub use cycle::{CycleOutcome, UpdateCycle};
pub use error::{Error, Result};
pub use health::{HealthExporter, HealthSnapshot, HealthState, HealthStatus};
pub use reconfig::{ReconfigurationController, ReloadOutcome};
pub use scheduler::Scheduler;
pub use traits::{DdnsUpdater, HealthListener, IpDiscovery};
