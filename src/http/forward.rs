//! Request forwarding.
//!
//! # Responsibilities
//! - Select a backend for each inbound request
//! - Rewrite the request URI to the chosen backend and proxy it
//! - Stream the backend response back, tagged with `X-Forwarded-Server`
//! - Map selection and upstream failures to 503/502 responses

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderValue, uri::Authority, uri::Scheme, Request, Response, StatusCode, Uri},
    response::IntoResponse,
};
use url::Url;

use crate::http::server::AppState;
use crate::observability::metrics;

/// Response header naming the backend that served the request.
pub const X_FORWARDED_SERVER: &str = "x-forwarded-server";

/// A request that could not be proxied. Every variant maps to an HTTP
/// response; nothing here can take the process down.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Selection found no healthy backend. No backend is contacted.
    #[error("no healthy backend available")]
    NoHealthyBackend,

    /// The chosen backend failed after selection succeeded.
    #[error("upstream request to {backend} failed: {source}")]
    Upstream {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The backend URL and request path could not be combined.
    #[error("could not build upstream URI: {0}")]
    UpstreamUri(String),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoHealthyBackend => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } | Self::UpstreamUri(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> axum::response::Response {
        let body = match &self {
            Self::NoHealthyBackend => "No healthy server available",
            Self::Upstream { .. } | Self::UpstreamUri(_) => "Upstream request failed",
        };
        (self.status(), body).into_response()
    }
}

/// Catch-all handler: every method, every path.
pub async fn forward_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> axum::response::Response {
    let started = Instant::now();
    let method = request.method().to_string();

    match forward(&state, request).await {
        Ok((response, backend)) => {
            metrics::record_request(&method, response.status().as_u16(), &backend, started);
            response.into_response()
        }
        Err(err) => {
            let backend = match &err {
                ForwardError::NoHealthyBackend => "none".to_string(),
                ForwardError::Upstream { backend, .. } => backend.clone(),
                ForwardError::UpstreamUri(_) => "unknown".to_string(),
            };
            metrics::record_request(&method, err.status().as_u16(), &backend, started);
            err.into_response()
        }
    }
}

/// Proxy one request to one backend. Single-attempt: a failure after
/// selection is surfaced to the caller, never retried elsewhere.
async fn forward(
    state: &AppState,
    request: Request<Body>,
) -> Result<(Response<Body>, String), ForwardError> {
    let guard = state
        .registry
        .select(state.strategy.as_ref())
        .ok_or(ForwardError::NoHealthyBackend)?;
    let backend_url = guard.url().clone();
    let backend_name = display_url(&backend_url);

    tracing::debug!(
        backend = %backend_name,
        method = %request.method(),
        path = %request.uri().path(),
        "forwarding request"
    );

    let (mut parts, body) = request.into_parts();
    parts.uri = upstream_uri(&parts.uri, &backend_url)?;
    let upstream_request = Request::from_parts(parts, body);

    match state.client.request(upstream_request).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            let mut response = Response::from_parts(parts, Body::new(body));
            if let Ok(value) = HeaderValue::from_str(&backend_name) {
                response.headers_mut().insert(X_FORWARDED_SERVER, value);
            }
            Ok((response, backend_name))
        }
        Err(err) => {
            tracing::error!(backend = %backend_name, error = %err, "upstream request failed");
            // Feed the same failure counters the active probes use, so a
            // dying backend drops out before the next sweep.
            if guard.mark_failure(state.unhealthy_threshold) {
                tracing::warn!(backend = %backend_name, "backend became unhealthy");
            }
            Err(ForwardError::Upstream {
                backend: backend_name,
                source: err,
            })
        }
    }
}

/// Rebuild the request URI against the backend's scheme and authority,
/// preserving the inbound path and query.
fn upstream_uri(original: &Uri, backend: &Url) -> Result<Uri, ForwardError> {
    let bad = |e: &dyn std::fmt::Display| ForwardError::UpstreamUri(e.to_string());

    let mut parts = original.clone().into_parts();
    parts.scheme = Some(Scheme::try_from(backend.scheme()).map_err(|e| bad(&e))?);
    parts.authority = Some(Authority::try_from(backend.authority()).map_err(|e| bad(&e))?);
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some("/".parse().map_err(|e| bad(&e))?);
    }
    Uri::from_parts(parts).map_err(|e| bad(&e))
}

/// Backend identity as reported in headers and logs: the URL without the
/// trailing slash normalization.
fn display_url(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
