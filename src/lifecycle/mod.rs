//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     validated config → prerequisite checks → subsystems start
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast to server, monitor, admin listener → drain
//!
//! Signals (signals.rs):
//!     SIGINT / SIGTERM → trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{check_prerequisites, StartupError};
