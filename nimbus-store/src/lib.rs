pub mod app_config;
pub mod error;
pub mod file_repo;
pub mod memory_repo;
pub mod redis_repo;

use nimbus_core::SnapshotRepository;
use std::sync::Arc;
use tracing::info;

pub use app_config::{Config, StorageBackend, StorageConfig};
pub use error::StoreError;
pub use file_repo::{FileSnapshotRepository, SNAPSHOT_FILE};
pub use memory_repo::InMemorySnapshotRepository;
pub use redis_repo::RedisClient;

/// Builds the snapshot repository selected by `storage.backend`.
pub async fn open_repository(
    config: &StorageConfig,
) -> Result<Arc<dyn SnapshotRepository>, StoreError> {
    let repository: Arc<dyn SnapshotRepository> = match config.backend {
        StorageBackend::File => {
            info!("Persisting orders under {}", config.path);
            Arc::new(FileSnapshotRepository::new(&config.path))
        }
        StorageBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                StoreError::Misconfigured(
                    "storage.redis_url is required for the redis backend".into(),
                )
            })?;
            info!("Persisting orders in redis key {}", config.key);
            Arc::new(RedisClient::new(url, &config.key).await?)
        }
        StorageBackend::Memory => {
            info!("Orders are kept in memory only");
            Arc::new(InMemorySnapshotRepository::new())
        }
    };
    Ok(repository)
}
