//! kvitto CLI - receipt analysis and export backend
//!
//! Usage:
//!   kvitto serve --port 8080     Start the API server
//!   kvitto analyze receipt.jpg   Run one image through the model provider

mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use kvitto_core::{GeminiBackend, ModelBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(&host, port).await,
        Commands::Analyze { file } => cmd_analyze(&file).await,
    }
}

async fn cmd_serve(host: &str, port: Option<u16>) -> Result<()> {
    let port = port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(8080);

    let config = kvitto_server::ServerConfig::from_env();
    let state = kvitto_server::AppState::from_env(config);

    kvitto_server::serve(state, host, port).await
}

async fn cmd_analyze(file: &Path) -> Result<()> {
    let model = GeminiBackend::from_env()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY not set"))?;

    let data = std::fs::read(file)?;
    let mime = match file.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };

    let parsed = model
        .parse_receipt(&data, mime)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}
