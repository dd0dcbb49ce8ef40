//! Backend Module
//!
//! The backing key-value store consulted on a cache miss. The cache never
//! talks to it; only the read-through path in [`crate::proxy`] does.

mod memory;
mod redis_backend;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;

/// A key-value store that can answer single-key lookups.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Looks up `key`.
    ///
    /// `Ok(None)` means the store has no such key; `Err` means the store
    /// could not be asked.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
