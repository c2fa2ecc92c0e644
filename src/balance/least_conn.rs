//! Least-connections selection strategy.

use std::sync::Arc;

use crate::balance::backend::Backend;
use crate::balance::registry::Registry;
use crate::balance::Strategy;

/// Picks the healthy backend with the fewest active connections.
///
/// Equal counts are broken by least-recently-used, then by registry
/// order, so an idle backend is preferred over one that just took a
/// request and fresh pools drain in insertion order.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LeastConnections {
    fn next_backend(&self, registry: &Registry) -> Option<Arc<Backend>> {
        registry
            .snapshot()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_healthy())
            .min_by_key(|(idx, b)| (b.active_connections(), b.last_used_seq(), *idx))
            .map(|(_, b)| b.clone())
    }

    fn name(&self) -> &'static str {
        "least_connections"
    }
}
