//! # TeTo — learning portal server
//!
//! Usage:
//!   teto                              # Serve on 0.0.0.0:5000, uploads in ./uploads
//!   teto --port 5001                  # Custom port
//!   teto --config ~/teto.toml -v      # Explicit config file, debug logging

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use teto::{build_router, AppState, Config, RouterOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "teto", version, about = "TeTo learning portal server")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Root directory for videos/ and materials/
    #[arg(long)]
    uploads_dir: Option<String>,

    /// Front-end build directory served for unmatched paths
    #[arg(long)]
    static_dir: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "teto=debug,tower_http=debug"
    } else {
        "teto=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.uploads_dir {
        config.storage.uploads_dir = dir;
    }
    if let Some(dir) = cli.static_dir {
        config.server.static_dir = Some(dir);
    }

    let state = AppState::from_config(&config).await?;
    tracing::info!(dir = %state.storage.base_dir().display(), "Upload directories ready");

    let app = build_router(state, &RouterOptions::from_config(&config));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server running on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
