pub mod memory;
pub mod redis;
pub mod traits;

pub use memory::InMemoryStore;
pub use traits::KvStore;

pub use self::redis::RedisStore;

use crate::config::CacheConfig;
use std::sync::Arc;

/// Factory: create the configured store backend.
///
/// Connection failure is fatal here - without the cache there is no login
/// reuse and no change detection, so the run cannot proceed.
pub async fn create_store(config: &CacheConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "redis" => Ok(Arc::new(RedisStore::connect(&config.url).await?)),
        other => {
            tracing::warn!("Unknown cache backend '{}', falling back to redis", other);
            Ok(Arc::new(RedisStore::connect(&config.url).await?))
        }
    }
}
