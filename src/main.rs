//! Process entry point: CLI parsing, startup sequencing, and wiring.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use load_balancer::balance::{strategy_for_name, Registry};
use load_balancer::config::{self, Config};
use load_balancer::health::HealthMonitor;
use load_balancer::http::HttpServer;
use load_balancer::lifecycle::{self, Shutdown};
use load_balancer::observability;

#[derive(Parser)]
#[command(
    name = "load-balancer",
    about = "HTTP load balancer with health-checked backend pools",
    version
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are fatal and happen before logging is up; print
    // them directly and refuse to serve.
    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    observability::logging::init(&config.observability.log_level);
    tracing::info!(
        path = %cli.config.display(),
        backends = config.servers.len(),
        strategy = %config.strategy,
        "configuration loaded"
    );

    match serve(config).await {
        Ok(()) => {
            tracing::info!("shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    lifecycle::check_prerequisites(&config).await?;

    let registry = Arc::new(Registry::from_urls(config.server_urls()?));
    // Validation already vouched for the strategy name; this is the
    // fallback for a Config built without going through the loader.
    let strategy = strategy_for_name(&config.strategy).ok_or_else(|| {
        config::ConfigError::Validation(vec![config::ValidationError {
            field: "strategy".to_string(),
            message: format!("unknown strategy '{}'", config.strategy),
        }])
    })?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(lifecycle::signals::shutdown_on_signal(shutdown.clone()));

    // Probe everything once before serving so the first request never
    // sees the unprobed (all-unhealthy) initial state.
    let monitor = HealthMonitor::new(registry.clone(), config.health_settings()?);
    monitor.sweep().await;
    tokio::spawn(monitor.run(shutdown.subscribe()));

    if config.admin.enabled {
        let admin_config = config.admin.clone();
        let admin_registry = registry.clone();
        let admin_strategy = strategy.name();
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) =
                load_balancer::admin::run(admin_config, admin_registry, admin_strategy, admin_shutdown)
                    .await
            {
                tracing::error!(error = %e, "admin listener failed");
            }
        });
    }

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    let server = HttpServer::new(&config, registry, strategy)?;
    server.run(listener, shutdown.subscribe()).await?;

    Ok(())
}
