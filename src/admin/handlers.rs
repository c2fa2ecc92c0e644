use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::balance::BackendStatus;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub strategy: &'static str,
    pub uptime_secs: u64,
    pub backends: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        strategy: state.strategy,
        uptime_secs: state.started.elapsed().as_secs(),
        backends: state.registry.len(),
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    Json(state.registry.status())
}
