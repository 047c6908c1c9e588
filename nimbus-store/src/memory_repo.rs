use async_trait::async_trait;
use nimbus_core::SnapshotRepository;
use tokio::sync::RwLock;

/// Keeps the latest snapshot in memory. Nothing survives a restart of the
/// process, but separate stores hydrated from the same instance share it.
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    snapshot: RwLock<Option<String>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: &str) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot.to_string())),
        }
    }

    pub async fn snapshot(&self) -> Option<String> {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn load_snapshot(
        &self,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.snapshot().await)
    }

    async fn save_snapshot(
        &self,
        snapshot: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        *self.snapshot.write().await = Some(snapshot.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_replaces_snapshot() {
        let repo = InMemorySnapshotRepository::with_snapshot("[]");
        assert_eq!(repo.load_snapshot().await.unwrap().as_deref(), Some("[]"));

        repo.save_snapshot("[{\"id\":1}]").await.unwrap();
        assert_eq!(repo.snapshot().await.as_deref(), Some("[{\"id\":1}]"));
    }
}
