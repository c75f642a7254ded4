// Entry point for an endpoint discovery run

use anyhow::{Context, Result};
use clap::Parser;
use endpoint_discovery::{AuthHeaders, DiscoveryConfig, EndpointDiscovery};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "discover")]
#[command(about = "Probe an undocumented REST API for working endpoints")]
struct Cli {
    /// JSON config file (DiscoveryConfig fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL to probe (overrides config and DISCOVERY_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Resource stem to probe; may be repeated
    #[arg(long = "stem")]
    stems: Vec<String>,

    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Debug logging for the discovery library
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the report on stdout stays parseable
    let default_filter = if cli.verbose {
        "info,endpoint_discovery=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load .env file if present
    let _ = dotenvy::dotenv();

    let config = load_config(&cli)?;
    let discovery = EndpointDiscovery::http(config).context("Failed to set up discovery")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight probes");
            on_interrupt.cancel();
        }
    });

    let report = discovery.run_until(cancel).await;
    tracing::info!("{}", report);

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Config file, then environment, then command-line overrides.
fn load_config(cli: &Cli) -> Result<DiscoveryConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<DiscoveryConfig>(&raw)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => DiscoveryConfig::default(),
    };

    if let Ok(base_url) = env::var("DISCOVERY_BASE_URL") {
        config.base_url = base_url;
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if !cli.stems.is_empty() {
        config.resource_stems = cli.stems.clone();
    }
    if let Some(depth) = cli.max_depth {
        config.max_depth = depth;
    }
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }

    let mut headers = AuthHeaders::new();
    if let Ok(token) = env::var("DISCOVERY_BEARER_TOKEN") {
        headers = headers.with_bearer_token(token);
    }
    if let Ok(org_id) = env::var("DISCOVERY_ORG_ID") {
        headers = headers.with_header("X-Organization-Id", org_id);
    }

    Ok(config.with_auth_headers(headers))
}
