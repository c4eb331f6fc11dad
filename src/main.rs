//! Wikigraph server - wiki-link resolution, Markdown preview and live page
//! graphs over HTTP and WebSocket.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use wikigraph::{serve, AppError, AppState, Config};

#[derive(Parser)]
#[command(name = "wikigraph")]
#[command(about = "Wiki-link resolver and interactive page graph server")]
struct Cli {
    /// Config file (defaults to ./wikigraph.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config
    #[arg(short, long)]
    bind: Option<String>,

    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(cli.config.as_deref()).map_err(AppError::Config)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    tracing::info!(
        bind = %config.server.bind,
        frame_rate = config.server.frame_rate,
        backend = ?config.layout.backend,
        graph_url = config.server.graph_url.as_deref().unwrap_or("<none>"),
        "loaded configuration"
    );

    let bind = config.server.bind.clone();
    serve(Arc::new(AppState::new(config)))
        .await
        .wrap_err_with(|| format!("server on {} failed", bind))?;
    Ok(())
}
