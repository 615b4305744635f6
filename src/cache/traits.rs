use async_trait::async_trait;

/// Key-value persistence for state that must survive across invocations.
///
/// Values are opaque serialized blobs; every write carries a TTL so stale
/// state ages out on its own. Implement for any store that can round-trip
/// bytes (Redis in production, an in-process map in tests).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name, for logs and diagnostics.
    fn name(&self) -> &str;

    /// Fetch a value. `Ok(None)` means the key is absent or expired.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Store a value with a relative expiry in seconds.
    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> anyhow::Result<()>;

    /// Health check
    async fn health_check(&self) -> bool;
}
