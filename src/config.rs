//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::{ProxyError, Result};

// == Protocol ==
/// Front-end protocol spoken to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// `GET /:key` over HTTP
    Http,
    /// Redis serialization protocol over raw TCP
    Resp,
}

impl FromStr for Protocol {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP" => Ok(Protocol::Http),
            "RESP" => Ok(Protocol::Resp),
            other => Err(ProxyError::Config(format!(
                "PROTOCOL must equal 'RESP' or 'HTTP', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("HTTP"),
            Protocol::Resp => f.write_str("RESP"),
        }
    }
}

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of cached entries, 0 = unbounded
    pub cache_capacity: usize,
    /// Entry lifetime in seconds, 0 = entries never expire
    pub cache_ttl: u64,
    /// Address of the backing Redis instance
    pub redis_addr: String,
    /// Front-end protocol to serve
    pub protocol: Protocol,
    /// Listen port
    pub port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 100)
    /// - `CACHE_TTL` - Entry lifetime in seconds (default: 300), `CACHE_TTTL` is read as a fallback
    /// - `REDIS_ADDR` - Backing Redis address (default: localhost:6379)
    /// - `PROTOCOL` - `HTTP` or `RESP` (default: HTTP)
    /// - `PORT` - Listen port (default: 8080)
    ///
    /// Unset variables take their default; set but unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let ttl = lookup("CACHE_TTL").or_else(|| lookup("CACHE_TTTL"));

        Ok(Self {
            cache_capacity: parse_or(
                "CACHE_CAPACITY",
                lookup("CACHE_CAPACITY"),
                defaults.cache_capacity,
            )?,
            cache_ttl: parse_or("CACHE_TTL", ttl, defaults.cache_ttl)?,
            redis_addr: lookup("REDIS_ADDR").unwrap_or(defaults.redis_addr),
            protocol: parse_or("PROTOCOL", lookup("PROTOCOL"), defaults.protocol)?,
            port: parse_or("PORT", lookup("PORT"), defaults.port)?,
        })
    }
}

fn parse_or<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ProxyError::Config(format!("failed to parse env var {}: '{}'", name, raw))
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            cache_ttl: 300,
            redis_addr: "localhost:6379".to_string(),
            protocol: Protocol::Http,
            port: 8080,
        }
    }
}
