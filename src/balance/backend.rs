//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server, identified by its URL
//! - Track health state with consecutive success/failure counters
//! - Track active connections (for Least Connections selection)
//! - Stamp last-used time on selection

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

/// A single backend server.
///
/// The URL is the backend's identity and never changes after construction.
/// All other state is atomic so request handlers and the health monitor can
/// update it concurrently without a lock.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    /// Current health flag. Backends start unhealthy and are admitted to
    /// the pool by their first successful probe.
    healthy: AtomicBool,
    /// Number of in-flight requests currently held against this backend.
    active_connections: AtomicUsize,
    /// Unix epoch millis of the most recent selection; 0 = never used.
    /// Display-only: wall-clock millis can tie, so ordering decisions use
    /// `last_used_seq` instead.
    last_used_ms: AtomicU64,
    /// Process-wide selection sequence number of the most recent
    /// selection; 0 = never used. Strictly ordered across backends.
    last_used_seq: AtomicU64,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

/// Global selection sequence. Gives every acquire a distinct, totally
/// ordered stamp.
static SELECTION_SEQ: AtomicU64 = AtomicU64::new(0);

impl Backend {
    /// Create a new backend. It stays out of rotation until a probe succeeds.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(false),
            active_connections: AtomicUsize::new(0),
            last_used_ms: AtomicU64::new(0),
            last_used_seq: AtomicU64::new(0),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Set the health flag directly, bypassing the threshold counters.
    /// Returns the previous value.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        self.healthy.swap(healthy, Ordering::Relaxed)
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn inc_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Epoch millis of the last selection, or `None` if never selected.
    pub fn last_used_ms(&self) -> Option<u64> {
        match self.last_used_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Selection sequence stamp of the last selection; 0 = never selected.
    pub fn last_used_seq(&self) -> u64 {
        self.last_used_seq.load(Ordering::Relaxed)
    }

    /// Report a successful probe or request. Returns `true` when this
    /// observation transitions the backend to healthy.
    ///
    /// `healthy_threshold` is the number of consecutive successes required;
    /// 1 means a single success flips the flag immediately.
    pub fn mark_success(&self, healthy_threshold: usize) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.healthy.load(Ordering::Relaxed) {
            return false;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold.max(1) {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.healthy.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Report a failed probe or request. Returns `true` when this
    /// observation transitions the backend to unhealthy.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if !self.healthy.load(Ordering::Relaxed) {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold.max(1) {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.healthy.store(false, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Take a connection slot: increments the active count, stamps
    /// last-used, and returns a guard that releases the slot on drop.
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        self.inc_connections();
        self.last_used_ms.store(now_epoch_ms(), Ordering::Relaxed);
        self.last_used_seq
            .store(SELECTION_SEQ.fetch_add(1, Ordering::Relaxed) + 1, Ordering::Relaxed);
        ConnectionGuard {
            backend: self.clone(),
        }
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// RAII guard holding one active-connection slot on a backend.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl ConnectionGuard {
    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }
}

impl Deref for ConnectionGuard {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.dec_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> Arc<Backend> {
        Arc::new(Backend::new(Url::parse(url).unwrap()))
    }

    #[test]
    fn starts_unhealthy() {
        let b = backend("http://localhost:5001");
        assert!(!b.is_healthy());
        assert_eq!(b.active_connections(), 0);
        assert_eq!(b.last_used_ms(), None);
    }

    #[test]
    fn single_success_flips_healthy_at_threshold_one() {
        let b = backend("http://localhost:5001");
        assert!(b.mark_success(1));
        assert!(b.is_healthy());
        // Already healthy: no further transition reported.
        assert!(!b.mark_success(1));
    }

    #[test]
    fn single_failure_flips_unhealthy_at_threshold_one() {
        let b = backend("http://localhost:5001");
        b.mark_success(1);
        assert!(b.mark_failure(1));
        assert!(!b.is_healthy());
        assert!(!b.mark_failure(1));
    }

    #[test]
    fn hysteresis_requires_consecutive_observations() {
        let b = backend("http://localhost:5001");
        assert!(!b.mark_success(2));
        assert!(!b.is_healthy());
        assert!(b.mark_success(2));
        assert!(b.is_healthy());

        // One failure is absorbed at threshold 2, and an interleaved
        // success resets the streak.
        assert!(!b.mark_failure(2));
        assert!(b.is_healthy());
        assert!(!b.mark_success(1));
        assert!(!b.mark_failure(2));
        assert!(b.mark_failure(2));
        assert!(!b.is_healthy());
    }

    #[test]
    fn guard_releases_connection_slot() {
        let b = backend("http://localhost:5001");
        let g1 = b.acquire();
        let g2 = b.acquire();
        assert_eq!(b.active_connections(), 2);
        assert!(b.last_used_ms().is_some());
        drop(g1);
        assert_eq!(b.active_connections(), 1);
        drop(g2);
        assert_eq!(b.active_connections(), 0);
    }

    #[test]
    fn concurrent_counter_updates_are_exact() {
        let b = backend("http://localhost:5001");
        let mut handles = Vec::new();
        for _ in 0..8 {
            let b = b.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    b.inc_connections();
                }
                for _ in 0..900 {
                    b.dec_connections();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        // 8 threads * (1000 - 900) net increments.
        assert_eq!(b.active_connections(), 800);
    }
}
