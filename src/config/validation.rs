//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic ones: URL and duration
//! parseability, referential sanity, value ranges. All failures are
//! collected and reported together rather than one at a time.

use std::collections::HashSet;

use url::Url;

use crate::balance::strategy_for_name;
use crate::config::schema::{parse_duration, Config};

/// One semantic problem with the configuration.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration. Pure function; returns every error
/// found, not just the first.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .port
        .trim_start_matches(':')
        .parse::<u16>()
        .is_err()
    {
        errors.push(ValidationError::new(
            "port",
            format!("'{}' is not a valid port number", config.port),
        ));
    }

    match parse_duration(&config.health_check_interval) {
        Err(e) => errors.push(ValidationError::new("healthCheckInterval", e.to_string())),
        Ok(interval) if interval.is_zero() => errors.push(ValidationError::new(
            "healthCheckInterval",
            "must be greater than zero",
        )),
        Ok(_) => {}
    }

    if let Err(e) = parse_duration(&config.request_timeout) {
        errors.push(ValidationError::new("requestTimeout", e.to_string()));
    }

    if let Err(e) = parse_duration(&config.health_check.timeout) {
        errors.push(ValidationError::new("healthCheck.timeout", e.to_string()));
    }

    if config.health_check.healthy_threshold == 0 {
        errors.push(ValidationError::new(
            "healthCheck.healthyThreshold",
            "must be at least 1",
        ));
    }
    if config.health_check.unhealthy_threshold == 0 {
        errors.push(ValidationError::new(
            "healthCheck.unhealthyThreshold",
            "must be at least 1",
        ));
    }

    if config.servers.is_empty() {
        errors.push(ValidationError::new("servers", "at least one backend URL is required"));
    }

    let mut seen = HashSet::new();
    for raw in &config.servers {
        match Url::parse(raw) {
            Ok(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    errors.push(ValidationError::new(
                        "servers",
                        format!("'{raw}' must use http or https"),
                    ));
                }
                if !seen.insert(url) {
                    errors.push(ValidationError::new(
                        "servers",
                        format!("duplicate backend URL '{raw}'"),
                    ));
                }
            }
            Err(e) => {
                errors.push(ValidationError::new(
                    "servers",
                    format!("'{raw}' is not a valid URL: {e}"),
                ));
            }
        }
    }

    if strategy_for_name(&config.strategy).is_none() {
        errors.push(ValidationError::new(
            "strategy",
            format!(
                "unknown strategy '{}' (expected round_robin or least_connections)",
                config.strategy
            ),
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new(
                "admin.apiKey",
                "required when the admin listener is enabled",
            ));
        }
        if config.admin.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bindAddress",
                format!("'{}' is not a valid socket address", config.admin.bind_address),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metricsAddress",
            format!(
                "'{}' is not a valid socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
