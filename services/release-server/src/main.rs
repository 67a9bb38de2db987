use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use feed::DownloadSettings;
use range_server::{create_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the release server
#[derive(Parser, Debug)]
#[clap(version, about = "Release feed and artifact download server")]
struct Args {
    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Release settings file (JSON)
    #[clap(long, default_value = "release.json")]
    settings: PathBuf,

    /// Directory holding the packaged artifacts
    #[clap(long, default_value = "artifacts")]
    artifact_root: PathBuf,

    /// Listen port
    #[clap(short, long, default_value = "4100")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw = std::fs::read_to_string(&args.settings)
        .with_context(|| format!("reading settings file {}", args.settings.display()))?;
    let settings: DownloadSettings =
        serde_json::from_str(&raw).context("parsing release settings")?;

    let state = Arc::new(AppState::new(args.artifact_root.clone(), &settings)?);
    info!(
        version = %state.current_version(),
        artifact_root = %args.artifact_root.display(),
        "serving release"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
