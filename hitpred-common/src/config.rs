//! Bootstrap configuration
//!
//! Every setting has a compiled default, so the binaries start with no
//! config file at all. A TOML file is located in this order:
//! 1. Explicit path (`--config` flag or `HITPRED_CONFIG`)
//! 2. `./hitpred.toml`
//! 3. `<user config dir>/hitpred/config.toml`
//!
//! An explicit path that cannot be read is an error; a missing discovered
//! file is not. Command-line flags and their environment variables are
//! applied on top by each binary.

use crate::dataset::DEFAULT_POPULARITY_THRESHOLD;
use crate::gbdt::BoostingParams;
use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Training CSV, relative to the working directory
pub const DEFAULT_DATASET_PATH: &str = "spotify_2015_2025_85k.csv";

/// Pipeline artifact, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "models/spotify_pipeline.json";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 5730;
pub const DEFAULT_UI_PORT: u16 = 5731;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HITPRED_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "hitpred.toml";

/// Complete bootstrap configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub paths: PathsConfig,
    pub api: ServerConfig,
    pub ui: ServerConfig,
    pub logging: LoggingConfig,
    pub training: TrainingConfig,
}

/// File locations
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub dataset: PathBuf,
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from(DEFAULT_DATASET_PATH),
            model: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

/// Listen address of one HTTP service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    /// Falls back to the service's own default port
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: None,
        }
    }
}

impl ServerConfig {
    /// Socket address, using `default_port` when none is configured
    pub fn socket_addr(&self, default_port: u16) -> Result<SocketAddr> {
        let port = self.port.unwrap_or(default_port);
        format!("{}:{}", self.host, port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address {}:{}: {}", self.host, port, e)))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` directive); `RUST_LOG` takes precedence
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Offline training job settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Popularity at or above which a track is labelled a hit
    pub popularity_threshold: f64,
    /// Held-out fraction
    pub test_size: f64,
    /// Seed of the train/test shuffle
    pub random_state: u64,
    pub boosting: BoostingParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            popularity_threshold: DEFAULT_POPULARITY_THRESHOLD,
            test_size: 0.2,
            random_state: 42,
            boosting: BoostingParams::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.popularity_threshold.is_finite() {
            return Err(Error::Config("popularity_threshold must be finite".to_string()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::Config(format!(
                "test_size must be within (0, 1), got {}",
                self.test_size
            )));
        }
        self.boosting.validate()
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.training.validate()?;
        Ok(config)
    }

    /// Parse the config file at `path`
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Locate and load the configuration
    ///
    /// Returns the path actually used, or `None` when running on compiled
    /// defaults. Called before logging is up, so the caller reports it.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = explicit {
            let config = Self::load_file(&path)?;
            return Ok((config, Some(path)));
        }

        match discover_config_file() {
            Some(path) => {
                let config = Self::load_file(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }
}

/// First existing config file among the implicit locations
pub fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("hitpred").join("config.toml"))
        .filter(|path| path.is_file())
}
