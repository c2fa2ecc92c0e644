//! Backend registry.
//!
//! # Responsibilities
//! - Own the ordered pool of backends (insertion order is load-bearing
//!   for round-robin determinism)
//! - Serve point-in-time snapshots to selection, health checking, and the
//!   status surface
//! - Apply targeted health/connection mutations by backend URL
//! - Hold the round-robin cursor

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::balance::backend::{Backend, ConnectionGuard};
use crate::balance::Strategy;

/// The authoritative collection of backends.
///
/// Structural changes (add/remove) serialize on the pool lock; per-backend
/// health and connection state is atomic. The lock is never held across
/// I/O or while touching any other synchronization primitive, so there is
/// no lock-ordering concern.
#[derive(Debug, Default)]
pub struct Registry {
    backends: RwLock<Vec<Arc<Backend>>>,
    cursor: AtomicUsize,
}

/// One row of the read-only status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub url: String,
    pub healthy: bool,
    pub active_connections: usize,
    pub last_used_ms: Option<u64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from pre-parsed backend URLs, preserving order.
    pub fn from_urls(urls: impl IntoIterator<Item = Url>) -> Self {
        let registry = Self::new();
        for url in urls {
            registry.add(Backend::new(url));
        }
        registry
    }

    /// Append a backend. Returns `false` (and drops the backend) if one
    /// with the same URL is already registered.
    pub fn add(&self, backend: Backend) -> bool {
        let mut backends = self.backends.write().unwrap();
        if backends.iter().any(|b| b.url() == backend.url()) {
            return false;
        }
        backends.push(Arc::new(backend));
        true
    }

    /// Remove a backend by URL. No-op if absent.
    pub fn remove(&self, url: &Url) -> bool {
        let mut backends = self.backends.write().unwrap();
        let before = backends.len();
        backends.retain(|b| b.url() != url);
        backends.len() != before
    }

    /// Ordered point-in-time copy of the pool. Callers iterate the
    /// snapshot without holding the pool lock.
    pub fn snapshot(&self) -> Vec<Arc<Backend>> {
        self.backends.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.backends.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.read().unwrap().is_empty()
    }

    /// Serializable view for the admin/status surface. Holds the read
    /// lock only for the copy.
    pub fn status(&self) -> Vec<BackendStatus> {
        self.snapshot()
            .iter()
            .map(|b| BackendStatus {
                url: b.url().to_string(),
                healthy: b.is_healthy(),
                active_connections: b.active_connections(),
                last_used_ms: b.last_used_ms(),
            })
            .collect()
    }

    /// Set a backend's health flag directly. Returns the previous flag,
    /// or `None` (no-op) if the backend is absent.
    pub fn set_health(&self, url: &Url, healthy: bool) -> Option<bool> {
        self.find(url).map(|b| b.set_healthy(healthy))
    }

    /// Record a successful probe. Returns `true` if the backend
    /// transitioned to healthy. No-op if the backend was removed.
    pub fn record_success(&self, url: &Url, healthy_threshold: usize) -> bool {
        self.find(url)
            .is_some_and(|b| b.mark_success(healthy_threshold))
    }

    /// Record a failed probe. Returns `true` if the backend transitioned
    /// to unhealthy. No-op if the backend was removed.
    pub fn record_failure(&self, url: &Url, unhealthy_threshold: usize) -> bool {
        self.find(url)
            .is_some_and(|b| b.mark_failure(unhealthy_threshold))
    }

    /// No-op if the backend is absent.
    pub fn increment_connections(&self, url: &Url) {
        if let Some(b) = self.find(url) {
            b.inc_connections();
        }
    }

    /// No-op if the backend is absent.
    pub fn decrement_connections(&self, url: &Url) {
        if let Some(b) = self.find(url) {
            b.dec_connections();
        }
    }

    /// Advance the round-robin cursor, returning its previous value.
    /// Callers reduce it modulo their snapshot length.
    pub fn advance_cursor(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed)
    }

    /// Run a selection strategy and hand out a connection guard for the
    /// chosen backend. `None` means no healthy backend is available.
    pub fn select(&self, strategy: &dyn Strategy) -> Option<ConnectionGuard> {
        strategy.next_backend(self).map(|b| b.acquire())
    }

    fn find(&self, url: &Url) -> Option<Arc<Backend>> {
        self.backends
            .read()
            .unwrap()
            .iter()
            .find(|b| b.url() == url)
            .cloned()
    }
}
