use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Byte-oriented key/value cache.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value in the cache. `None` keeps the entry until it is evicted.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;
}
