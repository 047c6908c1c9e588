use async_trait::async_trait;
use nimbus_core::SnapshotRepository;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

pub const SNAPSHOT_FILE: &str = "orders.json";

/// Stores the order snapshot as a single JSON file under a directory.
pub struct FileSnapshotRepository {
    path: PathBuf,
}

impl FileSnapshotRepository {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, snapshot: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Readers never see a half-written file.
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, snapshot).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Wrote {} bytes to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for FileSnapshotRepository {
    async fn load_snapshot(
        &self,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read().await?)
    }

    async fn save_snapshot(
        &self,
        snapshot: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.write(snapshot).await?)
    }
}
