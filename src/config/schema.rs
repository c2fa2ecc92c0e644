//! Configuration schema definitions.
//!
//! The configuration file is JSON with camelCase keys. Durations are
//! Go-style strings (`"10s"`, `"500ms"`, `"1m30s"`). Only `port` and
//! `servers` are required; every other field has a default.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::loader::ConfigError;
use crate::health::HealthSettings;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listen port, as a string (`"8080"` or `":8080"`).
    pub port: String,

    /// Time between health-check sweeps.
    #[serde(default = "default_interval")]
    pub health_check_interval: String,

    /// Backend URLs, in selection order.
    pub servers: Vec<String>,

    /// Selection policy: `"round_robin"` or `"least_connections"`.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Upper bound on a proxied request, enforced by the server.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    /// Health probe settings.
    #[serde(default)]
    pub health_check: HealthCheckConfig,

    /// Read-only status listener.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_interval() -> String {
    "10s".to_string()
}

fn default_strategy() -> String {
    "round_robin".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: "8080".to_string(),
            health_check_interval: default_interval(),
            servers: Vec::new(),
            strategy: default_strategy(),
            request_timeout: default_request_timeout(),
            health_check: HealthCheckConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Health probe settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckConfig {
    /// Path probed on each backend.
    pub path: String,

    /// Per-probe deadline.
    pub timeout: String,

    /// Consecutive successes required to mark a backend healthy.
    /// 1 means a single successful probe flips the flag.
    pub healthy_threshold: u32,

    /// Consecutive failures required to mark a backend unhealthy.
    /// 1 means a single failed probe flips the flag.
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            timeout: "5s".to_string(),
            healthy_threshold: 1,
            unhealthy_threshold: 1,
        }
    }
}

/// Admin status listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Bearer token required on admin requests.
    pub api_key: String,

    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObservabilityConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,

    pub metrics_enabled: bool,

    /// Prometheus exposition bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl Config {
    /// The socket address to serve on. Accepts `"8080"` and `":8080"`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let port: u16 = self
            .port
            .trim_start_matches(':')
            .parse()
            .map_err(|_| ConfigError::InvalidPort(self.port.clone()))?;
        Ok(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    /// Parse the configured backend URLs, preserving order.
    pub fn server_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.servers
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|source| ConfigError::InvalidServerUrl {
                    url: raw.clone(),
                    source,
                })
            })
            .collect()
    }

    pub fn health_check_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.health_check_interval)
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.request_timeout)
    }

    /// Resolve the health monitor parameters from the validated config.
    pub fn health_settings(&self) -> Result<HealthSettings, ConfigError> {
        Ok(HealthSettings {
            interval: self.health_check_interval()?,
            timeout: parse_duration(&self.health_check.timeout)?,
            path: self.health_check.path.clone(),
            healthy_threshold: self.health_check.healthy_threshold.max(1) as usize,
            unhealthy_threshold: self.health_check.unhealthy_threshold.max(1) as usize,
        })
    }
}

/// Parse a Go-style duration string: one or more `<integer><unit>`
/// components where the unit is `ms`, `s`, `m`, or `h` (`"10s"`,
/// `"500ms"`, `"1m30s"`).
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let s = value.trim();
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }

    let bytes = s.as_bytes();
    let mut total = Duration::ZERO;
    let mut i = 0;
    while i < bytes.len() {
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if digits_start == i {
            return Err(invalid("expected a number"));
        }
        let number: u64 = s[digits_start..i]
            .parse()
            .map_err(|_| invalid("number out of range"))?;

        let unit_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_digit() {
            i += 1;
        }
        total += match &s[unit_start..i] {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(number * 60),
            "h" => Duration::from_secs(number * 3600),
            "" => return Err(invalid("missing unit")),
            unit => {
                return Err(invalid(&format!(
                    "unknown unit '{unit}' (expected ms, s, m, or h)"
                )))
            }
        };
    }

    Ok(total)
}
