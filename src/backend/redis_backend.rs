//! Redis backend
//!
//! Reads values from a single Redis instance over a managed multiplexed
//! connection that reconnects on its own after failures.

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::error::Result;

/// Backing store client for Redis.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connects to Redis at `addr`.
    ///
    /// `addr` may be a bare `host:port` or a full `redis://` / `rediss://` URL.
    pub async fn connect(addr: &str) -> Result<Self> {
        let url = connection_url(addr);
        let client = Client::open(url.as_str())?;
        let conn = client.get_connection_manager().await?;

        info!(%url, "Connected to backing Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;

        debug!(key, found = value.is_some(), "Redis GET");
        Ok(value.map(Bytes::from))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Builds a connection URL, adding the `redis://` scheme to bare addresses.
fn connection_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{}", addr)
    }
}
