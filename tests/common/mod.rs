//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use load_balancer::balance::{strategy_for_name, Registry};
use load_balancer::config::Config;
use load_balancer::http::HttpServer;
use load_balancer::lifecycle::Shutdown;

/// Start a mock backend on an ephemeral port that always answers 200
/// with the given body. Returns its address.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, body.to_string()) }).await
}

/// Start a mock backend whose status and body come from the given
/// closure, evaluated per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]).to_string();
                        let is_head = head.starts_with("HEAD ");

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = if is_head {
                            format!(
                                "HTTP/1.1 {status_text}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                body.len()
                            )
                        } else {
                            format!(
                                "HTTP/1.1 {status_text}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                                body.len()
                            )
                        };
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that echoes the request line back as its body,
/// for asserting that method, path, and query pass through unchanged.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let request = String::from_utf8_lossy(&buf[..n]).to_string();
                        let request_line =
                            request.lines().next().unwrap_or_default().to_string();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{request_line}",
                            request_line.len()
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A port that accepts nothing: bind a listener and drop it.
pub async fn dead_backend_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn backend_url(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// Config pointing at the given backends, with fast health settings for
/// test use.
pub fn test_config(backends: &[SocketAddr]) -> Config {
    let mut config = Config::default();
    config.servers = backends.iter().map(|a| format!("http://{a}")).collect();
    config.health_check_interval = "100ms".to_string();
    config.health_check.timeout = "500ms".to_string();
    config
}

/// Build a registry over the config's backends and serve the balancer on
/// an ephemeral port. Backends start unhealthy unless `mark_healthy`.
pub async fn spawn_balancer(
    config: &Config,
    mark_healthy: bool,
) -> (SocketAddr, Arc<Registry>, Shutdown) {
    let registry = Arc::new(Registry::from_urls(config.server_urls().unwrap()));
    if mark_healthy {
        for backend in registry.snapshot() {
            backend.mark_success(1);
        }
    }

    let strategy = strategy_for_name(&config.strategy).unwrap();
    let server = HttpServer::new(config, registry.clone(), strategy).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Give the server a beat to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, registry, shutdown)
}

/// Fresh client with pooling disabled so every request opens a new
/// connection (keeps selection behavior observable).
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
