//! fzweb: fuzzy filename search over HTTP
//!
//! Serves a small search page and two endpoints:
//! - `POST /api/search` - fuzzy-match filenames under a search root
//! - `GET /api/download` - download one matched file

mod cli;
mod config;
mod error;
mod guard;
mod http;
mod search;

#[cfg(test)]
mod tests_http_api;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::{RootPolicy, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    serve(config).await
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let settings = match cli.config.clone().or_else(config::settings_path) {
        Some(path) => config::load_settings(&path)?,
        None => config::Settings::default(),
    };
    ServerConfig::resolve(cli, settings)
}

async fn serve(config: ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr()?;

    info!("Listening on http://{}", addr);
    info!("Search directory: {}", config.default_root.display());
    if config.root_policy == RootPolicy::Confined {
        info!("Client-supplied directories are confined to the search directory");
    }
    info!("Use -d or --dir to search another directory");

    let app = http::router(http::AppState::new(config));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
