//! Read-only status surface.
//!
//! Served on its own listener so the main catch-all route stays a pure
//! proxy. Terminal clients (`lb-cli`) poll these endpoints to render
//! backend status.

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::balance::Registry;
use crate::config::AdminConfig;
use self::auth::admin_auth;
use self::handlers::{get_backends, get_status};

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<Registry>,
    pub strategy: &'static str,
    pub api_key: Arc<str>,
    pub started: Instant,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}

/// Bind and serve the admin listener until shutdown.
pub async fn run(
    config: AdminConfig,
    registry: Arc<Registry>,
    strategy: &'static str,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let state = AdminState {
        registry,
        strategy,
        api_key: Arc::from(config.api_key.as_str()),
        started: Instant::now(),
    };

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "admin listener starting");

    axum::serve(listener, admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
