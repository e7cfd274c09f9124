//! Configuration - capture log location
//!
//! Read from a JSON file such as `{"capture": "/tmp/session.json"}`.
//! Unknown keys are ignored so the file can be shared with other tools.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "TRACECAP_CONFIG";

/// Capture log file used when no path is configured
pub const DEFAULT_CAPTURE_FILE: &str = "captures.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Path of the capture log
    #[serde(default = "default_capture")]
    pub capture: PathBuf,
}

fn default_capture() -> PathBuf {
    PathBuf::from(DEFAULT_CAPTURE_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: default_capture(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the file named by `TRACECAP_CONFIG`, or the defaults if unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                log::debug!("Loading configuration from {:?}", path);
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }
}
