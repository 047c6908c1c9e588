use async_trait::async_trait;

/// Durable storage for the order-set snapshot.
///
/// The snapshot is one opaque serialized blob that is fully rewritten on every
/// mutation; implementations do not interpret it.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Returns `None` when nothing has been written yet.
    async fn load_snapshot(
        &self,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    async fn save_snapshot(
        &self,
        snapshot: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
