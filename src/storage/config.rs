//! Storage configuration types and utilities

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// SQLite file database (default)
    Sqlite,
    /// Memory storage (for testing)
    Memory,
}

impl Default for BackendType {
    fn default() -> Self {
        Self::Sqlite
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// SQLite database file path
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Connection pool size for the SQLite backend
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            database_path: default_database_path(),
            max_connections: default_pool_size(),
        }
    }
}

impl StorageConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults: `PROCESSOS_STORAGE_BACKEND` (`sqlite`/`memory`) and
    /// `PROCESSOS_DATABASE_PATH`.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables on top of this configuration
    pub fn apply_env(&mut self) -> Result<(), String> {
        if let Ok(backend) = std::env::var("PROCESSOS_STORAGE_BACKEND") {
            self.backend = match backend.to_lowercase().as_str() {
                "sqlite" => BackendType::Sqlite,
                "memory" => BackendType::Memory,
                other => return Err(format!("Unknown storage backend: {other}")),
            };
        }

        if let Ok(path) = std::env::var("PROCESSOS_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Config for an in-memory store (tests)
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            ..Self::default()
        }
    }
}

// Default value functions for serde

fn default_database_path() -> PathBuf {
    PathBuf::from("processos.db")
}

fn default_pool_size() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_sqlite() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, BackendType::Sqlite);
        assert_eq!(config.database_path, PathBuf::from("processos.db"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: StorageConfig = toml::from_str("backend = \"memory\"").unwrap();
        assert_eq!(config.backend, BackendType::Memory);
        assert_eq!(config.max_connections, 5);
    }
}
