//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router: one catch-all route, every method
//! - Wire middleware (request timeout, request id, tracing)
//! - Hold the shared state handed to the forwarding path
//! - Serve until the shutdown signal fires, then drain gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, routing::any, Router};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::balance::{Registry, Strategy};
use crate::config::{Config, ConfigError};
use crate::http::forward;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};

/// Pooled client shared by all request handlers.
pub type HttpClient = Client<HttpConnector, Body>;

/// State injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub strategy: Arc<dyn Strategy>,
    pub client: HttpClient,
    /// Consecutive upstream failures that evict a backend (passive signal).
    pub unhealthy_threshold: usize,
}

/// The load balancer's public HTTP surface.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(
        config: &Config,
        registry: Arc<Registry>,
        strategy: Arc<dyn Strategy>,
    ) -> Result<Self, ConfigError> {
        let request_timeout = config.request_timeout()?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            registry,
            strategy,
            client,
            unhealthy_threshold: config.health_check.unhealthy_threshold.max(1) as usize,
        };

        Ok(Self {
            router: Self::build_router(state, request_timeout),
        })
    }

    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/", any(forward::forward_handler))
            .route("/{*path}", any(forward::forward_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Serve on the given listener until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::strategy_for_name;

    #[test]
    fn builds_from_a_default_config() {
        let config = Config::default();
        let registry = Arc::new(Registry::new());
        let strategy = strategy_for_name("round_robin").unwrap();
        assert!(HttpServer::new(&config, registry, strategy).is_ok());
    }

    #[test]
    fn rejects_an_unparsable_request_timeout() {
        let mut config = Config::default();
        config.request_timeout = "forever".to_string();
        let registry = Arc::new(Registry::new());
        let strategy = strategy_for_name("round_robin").unwrap();
        assert!(HttpServer::new(&config, registry, strategy).is_err());
    }
}
