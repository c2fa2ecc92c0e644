//! End-to-end selection and forwarding behavior.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn round_robin_alternates_and_tags_responses() {
    let b1 = common::start_mock_backend("b1").await;
    let b2 = common::start_mock_backend("b2").await;
    let config = common::test_config(&[b1, b2]);
    let (addr, _registry, shutdown) = common::spawn_balancer(&config, true).await;

    let client = common::test_client();
    let mut bodies = Vec::new();
    for _ in 0..4 {
        let response = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect("balancer unreachable");
        assert_eq!(response.status(), StatusCode::OK);

        let forwarded = response
            .headers()
            .get("x-forwarded-server")
            .expect("missing x-forwarded-server header")
            .to_str()
            .unwrap()
            .to_string();
        let body = response.text().await.unwrap();
        assert_eq!(forwarded, format!("http://{}", if body == "b1" { b1 } else { b2 }));
        bodies.push(body);
    }

    assert_eq!(bodies, vec!["b1", "b2", "b1", "b2"]);

    shutdown.trigger();
}

#[tokio::test]
async fn unhealthy_backends_are_never_contacted() {
    let healthy = common::start_mock_backend("alive").await;

    let hits = Arc::new(AtomicU32::new(0));
    let hit_counter = hits.clone();
    let sick = common::start_programmable_backend(move || {
        let hit_counter = hit_counter.clone();
        async move {
            hit_counter.fetch_add(1, Ordering::SeqCst);
            (200, "sick".to_string())
        }
    })
    .await;

    let config = common::test_config(&[healthy, sick]);
    let (addr, registry, shutdown) = common::spawn_balancer(&config, true).await;
    registry.set_health(&common::backend_url(sick), false);

    let client = common::test_client();
    for _ in 0..6 {
        let response = client.get(format!("http://{addr}/")).send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "alive");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn exhausted_pool_returns_503_without_contacting_backends() {
    let hits = Arc::new(AtomicU32::new(0));
    let hit_counter = hits.clone();
    let backend = common::start_programmable_backend(move || {
        let hit_counter = hit_counter.clone();
        async move {
            hit_counter.fetch_add(1, Ordering::SeqCst);
            (200, "never".to_string())
        }
    })
    .await;

    // Backends start unhealthy; never mark them.
    let config = common::test_config(&[backend]);
    let (addr, _registry, shutdown) = common::spawn_balancer(&config, false).await;

    let client = common::test_client();
    let response = client.get(format!("http://{addr}/")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "No healthy server available");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_death_yields_502_then_passive_eviction() {
    let dead = common::dead_backend_addr().await;
    let config = common::test_config(&[dead]);
    // Mark it healthy so selection picks it; the forward will fail.
    let (addr, _registry, shutdown) = common::spawn_balancer(&config, true).await;

    let client = common::test_client();
    let response = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "Upstream request failed");

    // The failed forward fed the failure counters: with the default
    // threshold of 1 the backend is already out of rotation.
    let response = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "No healthy server available");

    shutdown.trigger();
}

#[tokio::test]
async fn least_connections_avoids_the_busy_backend() {
    let slow = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_millis(400)).await;
        (200, "slow".to_string())
    })
    .await;
    let fast = common::start_mock_backend("fast").await;

    let mut config = common::test_config(&[slow, fast]);
    config.strategy = "least_connections".to_string();
    let (addr, _registry, shutdown) = common::spawn_balancer(&config, true).await;

    // First request heads to the slow backend (fresh pool drains in
    // registry order) and parks there.
    let client = common::test_client();
    let first = tokio::spawn({
        let client = client.clone();
        let url = format!("http://{addr}/");
        async move { client.get(url).send().await.unwrap().text().await.unwrap() }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    // While the slow backend holds a connection, traffic flows to the
    // idle one.
    for _ in 0..3 {
        let body = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "fast");
    }

    assert_eq!(first.await.unwrap(), "slow");

    shutdown.trigger();
}

#[tokio::test]
async fn method_path_and_query_pass_through() {
    let echo = common::start_echo_backend().await;
    let config = common::test_config(&[echo]);
    let (addr, _registry, shutdown) = common::spawn_balancer(&config, true).await;

    let client = common::test_client();
    let body = client
        .post(format!("http://{addr}/api/v1/items?page=2"))
        .body("payload")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "POST /api/v1/items?page=2 HTTP/1.1");

    shutdown.trigger();
}
