use super::traits::KvStore;
use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed store. The multiplexed connection manager reconnects on
/// command failure, so one instance serves the whole run.
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect eagerly so an unreachable store fails the run at startup,
    /// before any panel traffic happens.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("Invalid redis URL")?;
        let manager = client
            .get_connection_manager()
            .await
            .with_context(|| format!("Failed to connect to redis at {url}"))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}
