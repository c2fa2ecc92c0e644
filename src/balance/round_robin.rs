//! Round-robin selection strategy.

use std::sync::Arc;

use crate::balance::backend::Backend;
use crate::balance::registry::Registry;
use crate::balance::Strategy;

/// Cycles through the pool in registry order, skipping unhealthy backends.
///
/// The cursor advances once per examined position, so a skipped backend
/// costs one cursor step and the rotation stays deterministic for any
/// fixed health configuration.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RoundRobin {
    fn next_backend(&self, registry: &Registry) -> Option<Arc<Backend>> {
        let backends = registry.snapshot();
        if backends.is_empty() {
            return None;
        }

        // At most one full lap over the snapshot; a fruitless lap means
        // nothing is healthy right now.
        let len = backends.len();
        for _ in 0..len {
            let idx = registry.advance_cursor() % len;
            let backend = &backends[idx];
            if backend.is_healthy() {
                return Some(backend.clone());
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
