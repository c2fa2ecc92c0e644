//! Startup prerequisite checks.
//!
//! Run after config validation and before any subsystem starts, so a
//! doomed start fails with a precise message instead of a mid-boot bind
//! error.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::{Config, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("listen port {addr} is not available: {source}")]
    PortUnavailable {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Verify the listen port can be bound before anything else starts.
pub async fn check_prerequisites(config: &Config) -> Result<(), StartupError> {
    let addr = config.listen_addr()?;
    probe_bind(addr).await?;
    Ok(())
}

async fn probe_bind(addr: SocketAddr) -> Result<(), StartupError> {
    // Bind and immediately drop; the real listener binds right after.
    TcpListener::bind(addr)
        .await
        .map(drop)
        .map_err(|source| StartupError::PortUnavailable { addr, source })
}
