/*!
 * Beacon CLI - Command Line Interface
 */

use anyhow::Context;
use beacon::config::Config;
use beacon::logging;
use beacon_loader::{alive_origin, fetch_manifest, AssetLoader, HttpFetcher};
use beacon_sentinel::Monitor;
use beacon_server::{run_server, AppState, ServerConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(
    version,
    about = "Self-healing asset delivery: origin monitoring, failover and manifest-driven loading",
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config", default_value = "beacon.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the health monitor and the control plane server
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured bind port
        #[arg(long)]
        port: Option<u16>,

        /// Override the configured bucket directory
        #[arg(long, value_name = "DIR")]
        bucket_dir: Option<PathBuf>,
    },

    /// Plan a manifest-driven load against a running control plane
    Load {
        /// Base URL of the control plane
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        control: String,

        /// Fallback base URL; defaults to the control plane's bucket
        #[arg(long)]
        fallback: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init()?;

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    match cli.command {
        Command::Serve {
            host,
            port,
            bucket_dir,
        } => serve(config, host, port, bucket_dir).await,
        Command::Load { control, fallback } => load(&control, fallback).await,
    }
}

/// Start the sentinel monitor and the control plane server
async fn serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    bucket_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bucket_dir) = bucket_dir {
        config.bucket_dir = bucket_dir;
    }
    config.validate().context("Invalid configuration")?;

    let rules = config.compile_rules().context("Invalid rule configuration")?;
    if config.origins.is_empty() {
        tracing::warn!("No origins configured: failover will always answer null");
    }

    let monitor = Monitor::new(config.origins.clone(), config.probe.clone());
    let state = AppState::new(&config.bucket_dir, rules, &monitor)
        .context("Failed to initialize bucket state")?;

    tokio::spawn(async move {
        monitor.run().await;
    });

    let server_config = ServerConfig {
        host: config.host,
        port: config.port,
    };
    run_server(server_config, state)
        .await
        .context("Server terminated")
}

/// Query a control plane and report what a load session would inject
async fn load(control: &str, fallback: Option<String>) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let origin = alive_origin(&client, control).await;
    let manifest = fetch_manifest(&client, control).await;

    match &origin {
        Some(url) => println!("Preferred origin: {}", url),
        None => println!("No healthy origin, using fallback only"),
    }
    println!("Manifest entries: {}", manifest.len());

    let fallback =
        fallback.unwrap_or_else(|| format!("{}/files", control.trim_end_matches('/')));
    let loader = AssetLoader::new(Arc::new(HttpFetcher::new(client)), fallback);
    let report = loader.load(origin.as_deref(), &manifest).await;

    for injection in &report.injections {
        println!(
            "  loaded  {:<40} {:?} mode={} from {}",
            injection.hashed,
            injection.kind,
            injection.mode.as_str(),
            injection.url
        );
    }
    for name in &report.skipped {
        println!("  skipped {}", name);
    }
    for name in &report.failed {
        println!("  FAILED  {}", name);
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} asset(s) failed on every candidate", report.failed.len())
    }
}
