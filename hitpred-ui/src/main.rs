//! hitpred-ui - Browser front end for track popularity predictions
//!
//! Loads the fitted pipeline, mounts the hitpred-api router in-process and
//! serves the form page on top of it.

use anyhow::{Context, Result};
use clap::Parser;
use hitpred_api::server::shutdown_signal;
use hitpred_api::{load_pipeline, AppState};
use hitpred_common::config::{TomlConfig, DEFAULT_UI_PORT};
use hitpred_common::build_info;
use hitpred_common::logging::init_tracing;
use hitpred_ui::{build_router, UiState};
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for hitpred-ui
#[derive(Parser, Debug)]
#[command(name = "hitpred-ui")]
#[command(about = "Web form for track popularity predictions")]
#[command(version)]
struct Args {
    /// Config file (otherwise HITPRED_CONFIG, ./hitpred.toml, user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fitted pipeline artifact
    #[arg(short, long, env = "HITPRED_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "HITPRED_UI_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    build_info::log_startup("hitpred-ui", env!("CARGO_PKG_VERSION"));
    match &config_source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    if args.port.is_some() {
        config.ui.port = args.port;
    }
    let model_path = args.model.unwrap_or(config.paths.model);

    // Startup halts here if the artifact is missing or unusable
    let pipeline = load_pipeline(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;
    info!("Model loaded from {}", model_path.display());

    let api = hitpred_api::build_router(AppState::new(pipeline, model_path));
    let app = build_router(UiState::new(api));

    let addr = config.ui.socket_addr(DEFAULT_UI_PORT)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("hitpred-ui stopped");
    Ok(())
}
