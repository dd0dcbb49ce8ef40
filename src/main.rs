//! Redis Cache Proxy - A read-through cache in front of Redis
//!
//! Serves single-key lookups over HTTP or RESP from a bounded in-memory cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redis_cache_proxy::{proxy, AppState, Config, RedisBackend};

/// Main entry point for the cache proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the backing Redis instance
/// 4. Create the cache with configured capacity and TTL
/// 5. Serve the configured protocol on the configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redis_cache_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        "Configuration loaded: capacity={}, ttl={}s, redis={}, protocol={}, port={}",
        config.cache_capacity, config.cache_ttl, config.redis_addr, config.protocol, config.port
    );

    let backend = RedisBackend::connect(&config.redis_addr)
        .await
        .with_context(|| format!("failed to connect to Redis at {}", config.redis_addr))?;

    let state = AppState::from_config(&config, Arc::new(backend));
    let cache = Arc::clone(&state.cache);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Initializing {} redis proxy on {}", config.protocol, addr);

    proxy::serve(config.protocol, listener, state, shutdown_signal())
        .await
        .context("proxy server failed")?;

    let stats = cache.stats();
    info!(
        hit_rate = stats.hit_rate(),
        stats = %serde_json::to_string(&stats).unwrap_or_default(),
        "Proxy shutdown complete"
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
