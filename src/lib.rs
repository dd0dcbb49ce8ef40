//! Redis Cache Proxy - A read-through cache in front of Redis
//!
//! Serves single-key lookups over HTTP or RESP from a bounded in-memory cache
//! with LRU eviction and lazy TTL expiration, falling back to Redis on a miss.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod proxy;

pub use backend::{Backend, MemoryBackend, RedisBackend};
pub use cache::Cache;
pub use config::{Config, Protocol};
pub use error::{ProxyError, Result};
pub use proxy::AppState;
