//! Cache layer
//!
//! In-process TTL cache in front of the read paths of the services. Keys are
//! namespaced by a per-service prefix (`post:`, `category:` ...) so a write
//! can invalidate everything it affects with one pattern delete.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache operations
///
/// The methods are generic, so the trait is used through concrete types
/// rather than as a trait object.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all keys matching a glob pattern (`*`, `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Cache type shared by the services
pub type Cache = MemoryCache;

/// Create the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    let ttl = Duration::from_secs(config.ttl_seconds.max(1));
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}
