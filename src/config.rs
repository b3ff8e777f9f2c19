//! Application configuration
//!
//! Loaded from an optional TOML file, then overlaid with `PROCESSOS_*`
//! environment variables, then with explicit CLI flags (the binary applies
//! those last).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::storage::StorageConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration: TOML file (when given) then env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("PROCESSOS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PROCESSOS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PROCESSOS_PORT: {port}")))?;
        }
        self.storage.apply_env().map_err(Error::Config)?;
        Ok(())
    }
}

// Default value functions for serde

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}
