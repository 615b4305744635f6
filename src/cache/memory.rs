use super::traits::KvStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// In-process store for tests and ephemeral runs. Honors TTLs so expiry
/// behavior can be exercised without a real Redis.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> anyhow::Result<()> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries.lock().insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
