//! hitpred-api - Popularity prediction service
//!
//! Loads the fitted pipeline once at startup and serves `POST /predict`,
//! `GET /model` and `GET /health`. A missing or unusable artifact halts
//! startup.

use anyhow::{Context, Result};
use clap::Parser;
use hitpred_api::server::shutdown_signal;
use hitpred_api::{build_router, load_pipeline, AppState};
use hitpred_common::config::{TomlConfig, DEFAULT_API_PORT};
use hitpred_common::build_info;
use hitpred_common::logging::init_tracing;
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for hitpred-api
#[derive(Parser, Debug)]
#[command(name = "hitpred-api")]
#[command(about = "Serve track popularity predictions over HTTP")]
#[command(version)]
struct Args {
    /// Config file (otherwise HITPRED_CONFIG, ./hitpred.toml, user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fitted pipeline artifact
    #[arg(short, long, env = "HITPRED_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "HITPRED_API_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    build_info::log_startup("hitpred-api", env!("CARGO_PKG_VERSION"));
    match &config_source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    if args.port.is_some() {
        config.api.port = args.port;
    }
    let model_path = args.model.unwrap_or(config.paths.model);

    let pipeline = load_pipeline(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;
    info!(
        trees = pipeline.classifier.trees.len(),
        features = pipeline.preprocessor.n_features(),
        "Model loaded from {} (trained {})",
        model_path.display(),
        pipeline.metadata.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let app = build_router(AppState::new(pipeline, model_path));

    let addr = config.api.socket_addr(DEFAULT_API_PORT)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("hitpred-api stopped");
    Ok(())
}
