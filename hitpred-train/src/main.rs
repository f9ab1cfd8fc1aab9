//! hitpred-train - Offline training job
//!
//! Reads the historical track CSV, fits the preprocessing + gradient-boosted
//! classifier pipeline, reports held-out ROC-AUC and writes the pipeline
//! artifact served by hitpred-api.
//!
//! Runs with no arguments: paths default to `spotify_2015_2025_85k.csv` and
//! `models/spotify_pipeline.json` relative to the working directory.

use anyhow::{Context, Result};
use clap::Parser;
use hitpred_common::config::TomlConfig;
use hitpred_common::build_info;
use hitpred_common::logging::init_tracing;
use hitpred_common::training;
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for hitpred-train
#[derive(Parser, Debug)]
#[command(name = "hitpred-train")]
#[command(about = "Train the track popularity pipeline")]
#[command(version)]
struct Args {
    /// Config file (otherwise HITPRED_CONFIG, ./hitpred.toml, user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training CSV
    #[arg(short, long, env = "HITPRED_DATASET")]
    dataset: Option<PathBuf>,

    /// Where to write the fitted pipeline
    #[arg(short, long, env = "HITPRED_MODEL_PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    build_info::log_startup("hitpred-train", env!("CARGO_PKG_VERSION"));
    match &config_source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    let dataset_path = args.dataset.unwrap_or(config.paths.dataset);
    let model_path = args.output.unwrap_or(config.paths.model);

    let report = training::run(&dataset_path, &model_path, &config.training)
        .with_context(|| format!("Training on {} failed", dataset_path.display()))?;

    info!(
        rows = report.dataset_rows,
        train = report.train_rows,
        test = report.test_rows,
        trees = report.trees,
        "Training finished in {:.1}s (positive rate {:.1}%)",
        report.elapsed.as_secs_f64(),
        report.positive_rate * 100.0
    );
    for (name, gain) in &report.top_features {
        info!("  {:<32} gain {:>12.3}", name, gain);
    }

    println!("ROC-AUC: {}", report.roc_auc);
    println!("Accuracy: {:.4}  Log-loss: {:.4}", report.accuracy, report.log_loss);
    println!("Model saved to {}", report.model_path.display());

    Ok(())
}
