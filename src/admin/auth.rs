use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::admin::AdminState;

/// Require `Authorization: Bearer <apiKey>` on every admin request.
pub async fn admin_auth(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", state.api_key));

    if authorized {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use url::Url;

    use crate::admin::{admin_router, AdminState};
    use crate::balance::Registry;

    fn state() -> AdminState {
        let registry = Arc::new(Registry::from_urls([
            Url::parse("http://localhost:5001").unwrap()
        ]));
        AdminState {
            registry,
            strategy: "round_robin",
            api_key: Arc::from("secret"),
            started: Instant::now(),
        }
    }

    #[tokio::test]
    async fn rejects_requests_without_a_token() {
        let router = admin_router(state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/admin/backends")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_a_wrong_token() {
        let router = admin_router(state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn serves_backend_status_with_the_right_token() {
        let router = admin_router(state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/admin/backends")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["url"], "http://localhost:5001/");
        assert_eq!(rows[0]["healthy"], false);
    }
}
