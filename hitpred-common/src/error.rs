//! Common error types for the hit predictor

use thiserror::Error;

/// Common result type for hit predictor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the training job and the services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training dataset is malformed
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Fitting or evaluation failed
    #[error("Training error: {0}")]
    Training(String),

    /// Pipeline artifact could not be used
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
