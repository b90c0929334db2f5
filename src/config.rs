//! Store configuration loading
//!
//! Configuration is resolved in layers: built-in defaults, then an optional
//! `bench-store.toml` (or an explicit `--config` path), then environment
//! variables. CLI flags are applied last by the caller.
//!
//! # Example bench-store.toml
//!
//! ```toml
//! root = "./bench-data"
//! repo_url = "https://github.com/acme/vm"
//! skew_tolerance_ms = 0
//! flush_deadline_ms = 5000
//!
//! [detector]
//! window = 5
//! threshold_pct = 10.0
//!
//! [detector.directions]
//! "decode/throughput" = "higher-is-better"
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::regression::DetectorConfig;
use crate::store::SeriesStore;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "bench-store.toml";

/// Overrides the store root directory.
pub const ENV_STORE_PATH: &str = "BENCH_STORE_PATH";

/// Overrides `detector.threshold_pct` (a percentage, e.g. `10` for 10%).
pub const ENV_THRESHOLD_PCT: &str = "BENCH_STORE_THRESHOLD_PCT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("invalid value for {var}: {value:?}")]
    BadEnvVar { var: &'static str, value: String },
}

/// Root configuration for the store binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON document per suite.
    pub root: PathBuf,

    /// Repository URL stamped into persisted documents.
    pub repo_url: String,

    /// Allowed backwards clock drift for record dates, in milliseconds.
    pub skew_tolerance_ms: u64,

    /// Upper bound on the per-append fsync wait, in milliseconds.
    pub flush_deadline_ms: u64,

    /// Regression detector settings.
    pub detector: DetectorConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./bench-data"),
            repo_url: String::new(),
            skew_tolerance_ms: 0, // Strictly non-decreasing dates
            flush_deadline_ms: 5_000,
            detector: DetectorConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist; the default file is optional. Environment
    /// overrides are applied afterwards and the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(root) = std::env::var(ENV_STORE_PATH) {
            if root.is_empty() {
                return Err(ConfigError::BadEnvVar {
                    var: ENV_STORE_PATH,
                    value: root,
                });
            }
            self.root = PathBuf::from(root);
        }

        if let Ok(raw) = std::env::var(ENV_THRESHOLD_PCT) {
            let pct: f64 = raw.parse().map_err(|_| ConfigError::BadEnvVar {
                var: ENV_THRESHOLD_PCT,
                value: raw.clone(),
            })?;
            self.detector.threshold_pct = pct;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_deadline_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "flush_deadline_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        self.detector.validate().map_err(|message| ConfigError::Invalid {
            field: "detector",
            message,
        })
    }

    pub fn flush_deadline(&self) -> Duration {
        Duration::from_millis(self.flush_deadline_ms)
    }

    /// Construct the store this configuration describes.
    pub fn build_store(&self) -> SeriesStore {
        SeriesStore::new(self.root.clone())
            .with_repo_url(self.repo_url.as_str())
            .with_skew_tolerance_ms(self.skew_tolerance_ms)
            .with_flush_deadline(self.flush_deadline())
    }
}
