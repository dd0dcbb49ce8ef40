//! Proxy Module
//!
//! Front-ends that add caching to a single backing store. Both protocols share
//! [`AppState::read_through`]; they differ only in how keys arrive and how
//! values are written back.
//!
//! # Front-ends
//! - HTTP: `GET /:key`
//! - RESP: `GET key` over raw TCP

pub mod http;
pub mod resp;

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;
use tracing::debug;

use crate::backend::Backend;
use crate::cache::Cache;
use crate::config::{Config, Protocol};
use crate::error::Result;

pub use http::create_router;

/// State shared by every connection and request handler.
#[derive(Clone)]
pub struct AppState {
    /// Read-through cache
    pub cache: Arc<Cache>,
    /// Store consulted on cache misses
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(cache: Cache, backend: Arc<dyn Backend>) -> Self {
        Self {
            cache: Arc::new(cache),
            backend,
        }
    }

    /// Creates the cache from configuration and pairs it with `backend`.
    pub fn from_config(config: &Config, backend: Arc<dyn Backend>) -> Self {
        Self::new(Cache::new(config.cache_capacity, config.cache_ttl), backend)
    }

    /// Looks `key` up in the cache, falling back to the backend on a miss.
    ///
    /// Values found in the backend are written into the cache before being
    /// returned. Backend misses and failures leave the cache untouched.
    pub async fn read_through(&self, key: &str) -> Result<Option<Bytes>> {
        if let Some(value) = self.cache.get(key) {
            debug!(key, "Cache hit");
            return Ok(Some(value));
        }

        let value = self.backend.get(key).await?;
        match &value {
            Some(value) => {
                debug!(key, backend = self.backend.name(), "Cache miss, filled from backend");
                self.cache.set(key, value.clone());
            }
            None => debug!(key, backend = self.backend.name(), "Key not found in backend"),
        }
        Ok(value)
    }
}

/// Serves `protocol` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    protocol: Protocol,
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match protocol {
        Protocol::Http => {
            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(shutdown)
                .await?;
            Ok(())
        }
        Protocol::Resp => resp::serve(listener, state, shutdown).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::ProxyError;
    use async_trait::async_trait;

    struct FailingBackend;

    #[async_trait]
    impl Backend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            Err(ProxyError::Backend("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn state_with(backend: Arc<MemoryBackend>, capacity: usize) -> AppState {
        AppState::new(Cache::new(capacity, 0), backend)
    }

    #[tokio::test]
    async fn test_read_through_fills_cache_once() {
        let backend = Arc::new(MemoryBackend::with_entries([("philz", "coffee")]));
        let state = state_with(backend.clone(), 5);

        let first = state.read_through("philz").await.unwrap();
        let second = state.read_through("philz").await.unwrap();

        assert_eq!(first, Some(Bytes::from_static(b"coffee")));
        assert_eq!(second, first);
        assert_eq!(backend.lookups(), 1, "Second read should be served from cache");
    }

    #[tokio::test]
    async fn test_read_through_serves_stale_cache_over_backend() {
        let backend = Arc::new(MemoryBackend::with_entries([("k", "v1")]));
        let state = state_with(backend.clone(), 5);

        state.read_through("k").await.unwrap();
        backend.insert("k", "v2");

        assert_eq!(
            state.read_through("k").await.unwrap(),
            Some(Bytes::from_static(b"v1"))
        );
    }

    #[tokio::test]
    async fn test_read_through_does_not_cache_misses() {
        let backend = Arc::new(MemoryBackend::new());
        let state = state_with(backend.clone(), 5);

        assert_eq!(state.read_through("starbucks").await.unwrap(), None);
        assert_eq!(state.read_through("starbucks").await.unwrap(), None);

        assert_eq!(backend.lookups(), 2);
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_read_through_propagates_backend_errors() {
        let state = AppState::new(Cache::new(5, 0), Arc::new(FailingBackend));

        let result = state.read_through("anything").await;

        assert!(matches!(result, Err(ProxyError::Backend(_))));
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_read_through_prefers_cache_when_backend_is_down() {
        let state = AppState::new(Cache::new(5, 0), Arc::new(FailingBackend));
        state.cache.set("warm", "value");

        assert_eq!(
            state.read_through("warm").await.unwrap(),
            Some(Bytes::from_static(b"value"))
        );
    }

    #[test]
    fn test_from_config_uses_cache_settings() {
        let config = Config {
            cache_capacity: 3,
            cache_ttl: 0,
            ..Config::default()
        };
        let state = AppState::from_config(&config, Arc::new(MemoryBackend::new()));

        assert_eq!(state.cache.capacity(), 3);
        assert_eq!(state.cache.ttl(), None);
    }
}
