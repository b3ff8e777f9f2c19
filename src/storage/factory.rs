//! Storage factory for creating store instances

use std::sync::Arc;

use super::backends::{MemoryBackend, SqliteBackend};
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::ProcessStore;

/// Factory for creating process store instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create a store from environment configuration
    pub async fn from_env() -> StorageResult<Arc<dyn ProcessStore>> {
        let config = StorageConfig::from_env().map_err(super::error::StorageError::configuration)?;
        Self::from_config(&config).await
    }

    /// Create a store from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ProcessStore>> {
        match config.backend {
            BackendType::Sqlite => {
                let backend = SqliteBackend::new(config).await?;
                Ok(Arc::new(backend))
            }
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_creates_memory_backend() {
        let storage = StorageFactory::from_config(&StorageConfig::memory())
            .await
            .unwrap();
        let health = storage.health_check().await.unwrap();
        assert!(health.healthy);
        assert_eq!(health.backend_type, "memory");
    }

    #[tokio::test]
    async fn factory_creates_sqlite_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend: BackendType::Sqlite,
            database_path: dir.path().join("factory-test.db"),
            ..StorageConfig::default()
        };

        let storage = StorageFactory::from_config(&config).await.unwrap();
        let health = storage.health_check().await.unwrap();
        assert!(health.healthy);
        assert_eq!(health.backend_type, "sqlite");
    }
}
