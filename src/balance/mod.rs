//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → registry.rs select() takes a pool snapshot
//!     → Apply selection strategy:
//!         - round_robin.rs (cursor scan, skip unhealthy)
//!         - least_conn.rs (fewest active connections among healthy)
//!     → backend.rs acquire() (count the connection, stamp last-used)
//!     → Return connection guard, or None when nothing is healthy
//! ```
//!
//! # Design Decisions
//! - Backends are owned by the registry and shared as `Arc`
//! - Strategies never perform I/O; they read a snapshot and atomics
//! - Unhealthy backends are excluded from selection, never returned
//! - The round-robin cursor lives on the registry so strategies stay
//!   stateless and interchangeable

pub mod backend;
pub mod least_conn;
pub mod registry;
pub mod round_robin;

use std::sync::Arc;

pub use backend::{Backend, ConnectionGuard};
pub use least_conn::LeastConnections;
pub use registry::{BackendStatus, Registry};
pub use round_robin::RoundRobin;

/// A selection strategy over the registry's current pool.
pub trait Strategy: Send + Sync {
    /// Pick the next backend, or `None` when no healthy backend exists.
    fn next_backend(&self, registry: &Registry) -> Option<Arc<Backend>>;

    /// Strategy name for logging and the status surface.
    fn name(&self) -> &'static str;
}

/// Build a strategy from its configured name.
pub fn strategy_for_name(name: &str) -> Option<Arc<dyn Strategy>> {
    match name {
        "round_robin" => Some(Arc::new(RoundRobin::new())),
        "least_connections" => Some(Arc::new(LeastConnections::new())),
        _ => None,
    }
}
