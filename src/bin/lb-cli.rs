//! Terminal status client for the load balancer's admin listener.

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use load_balancer::balance::BackendStatus;

#[derive(Parser)]
#[command(name = "lb-cli")]
#[command(about = "Status CLI for the load balancer", long_about = None)]
struct Cli {
    /// Admin listener base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    /// Admin API key (Bearer token).
    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balancer version, strategy, and uptime
    Status,
    /// List backends with health and connection counts
    Backends,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let body: Value = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Backends => {
            let backends: Vec<BackendStatus> = client
                .get(format!("{}/admin/backends", cli.url))
                .headers(headers)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            print_backend_table(&backends);
        }
    }

    Ok(())
}

fn print_backend_table(backends: &[BackendStatus]) {
    let width = backends
        .iter()
        .map(|b| b.url.len())
        .max()
        .unwrap_or(6)
        .max("SERVER".len());

    println!("{:<width$}  {:<10}  {}", "SERVER", "STATUS", "ACTIVE");
    for backend in backends {
        let status = if backend.healthy {
            "✓ healthy"
        } else {
            "✗ down"
        };
        println!(
            "{:<width$}  {:<10}  {}",
            backend.url, status, backend.active_connections
        );
    }
}
