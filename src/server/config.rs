//! Configuration loading for the recorder and its query endpoint.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (must exist)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! When no file is found the defaults apply.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::recorder::{DEFAULT_BACKEND, DEFAULT_HISTORY_CAPACITY, Recorder, RecorderBuilder};
use crate::{HuginnError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

/// Query endpoint network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9742).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl ServerConfig {
    /// Parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address
            .parse()
            .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))
    }
}

fn default_address() -> String {
    "127.0.0.1:9742".to_string()
}

/// Recorder settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// Records kept per runner (default: 10).
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Backend addressed by model-name queries (default: "llama.cpp").
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            backend: default_backend(),
        }
    }
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl RecorderConfig {
    /// A [`RecorderBuilder`] with these settings applied.
    ///
    /// The normalizer is left at its default; set it on the returned builder.
    pub fn builder(&self) -> RecorderBuilder {
        Recorder::builder()
            .history_capacity(self.history_capacity)
            .backend(self.backend.clone())
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    ///
    /// Falls back to [`Config::default`] when nothing is found.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
