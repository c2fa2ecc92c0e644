//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered backend
//! - Update backend health through registry operations
//! - Log health transitions and keep the health gauge current

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::sync::broadcast;
use tokio::time;
use url::Url;

use crate::balance::Registry;
use crate::observability::metrics;

/// Outcome of a single failed liveness probe. Consumed immediately to
/// update the backend's health; never propagated to request handlers.
#[derive(Debug, thiserror::Error)]
pub enum HealthProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),
    #[error("non-success status {0}")]
    Status(StatusCode),
    #[error("could not build probe request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Resolved health-check parameters, produced from the validated config.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Time between sweeps.
    pub interval: Duration,
    /// Per-probe deadline.
    pub timeout: Duration,
    /// Path probed on each backend.
    pub path: String,
    /// Consecutive successes required to mark healthy (1 = immediate).
    pub healthy_threshold: usize,
    /// Consecutive failures required to mark unhealthy (1 = immediate).
    pub unhealthy_threshold: usize,
}

pub struct HealthMonitor {
    registry: Arc<Registry>,
    settings: HealthSettings,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>, settings: HealthSettings) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            settings,
            client,
        }
    }

    /// Run periodic sweeps until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.settings.interval,
            timeout = ?self.settings.timeout,
            path = %self.settings.path,
            "health monitor starting"
        );

        let mut ticker = time::interval(self.settings.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("health monitor received shutdown signal, exiting");
                    break;
                }
            }
        }
    }

    /// Probe every backend in the current snapshot concurrently and apply
    /// the outcomes. Also invoked once at startup so the first request
    /// never sees unprobed state.
    pub async fn sweep(&self) {
        let backends = self.registry.snapshot();
        let probes = backends.iter().map(|backend| {
            let url = backend.url().clone();
            async move {
                let outcome = self.probe(&url).await;
                (url, outcome)
            }
        });

        for (url, outcome) in join_all(probes).await {
            match outcome {
                Ok(()) => {
                    if self
                        .registry
                        .record_success(&url, self.settings.healthy_threshold)
                    {
                        tracing::info!(backend = %url, "backend became healthy");
                    }
                }
                Err(err) => {
                    tracing::debug!(backend = %url, error = %err, "health probe failed");
                    if self
                        .registry
                        .record_failure(&url, self.settings.unhealthy_threshold)
                    {
                        tracing::warn!(backend = %url, error = %err, "backend became unhealthy");
                    }
                }
            }
            if let Some(backend) = backends.iter().find(|b| b.url() == &url) {
                metrics::record_backend_health(url.as_str(), backend.is_healthy());
            }
        }
    }

    /// One HEAD probe against a backend, bounded by the configured timeout.
    async fn probe(&self, url: &Url) -> Result<(), HealthProbeError> {
        let target = url
            .join(&self.settings.path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        let request = Request::builder()
            .method(Method::HEAD)
            .uri(target)
            .header("user-agent", "load-balancer-health-check")
            .body(Body::empty())?;

        match time::timeout(self.settings.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(HealthProbeError::Status(status))
                }
            }
            Ok(Err(err)) => Err(HealthProbeError::Connect(err)),
            Err(_) => Err(HealthProbeError::Timeout(self.settings.timeout)),
        }
    }
}
