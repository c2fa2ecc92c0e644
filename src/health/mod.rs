//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs):
//!     tick → probe every backend in the current snapshot, in parallel
//!          → map outcome: 2xx = success, anything else = failure
//!          → registry.record_success / record_failure
//!          → log transitions, update the health gauge
//!
//! Passive signal (http/forward.rs):
//!     upstream request failure → same failure counters
//! ```
//!
//! # Design Decisions
//! - Probes are independent per backend; one hung backend cannot delay
//!   the others' checks
//! - A single probe flips the flag by default; thresholds > 1 enable
//!   flap damping
//! - The monitor only writes through registry operations and never
//!   touches request handling

pub mod monitor;

pub use monitor::{HealthMonitor, HealthProbeError, HealthSettings};
