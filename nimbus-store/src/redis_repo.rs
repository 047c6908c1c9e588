use async_trait::async_trait;
use nimbus_core::SnapshotRepository;
use redis::{AsyncCommands, RedisResult};
use tracing::debug;

pub const DEFAULT_SNAPSHOT_KEY: &str = "nimbus:orders:snapshot";

/// Keeps the order snapshot in a single redis string key.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    key: String,
}

impl RedisClient {
    pub async fn new(connection_string: &str, key: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            key: key.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn get_snapshot(&self) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(&self.key).await
    }

    pub async fn set_snapshot(&self, snapshot: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(&self.key, snapshot).await?;
        debug!("Snapshot stored in {} ({} bytes)", self.key, snapshot.len());
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for RedisClient {
    async fn load_snapshot(
        &self,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.get_snapshot().await?)
    }

    async fn save_snapshot(
        &self,
        snapshot: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.set_snapshot(snapshot).await?)
    }
}
