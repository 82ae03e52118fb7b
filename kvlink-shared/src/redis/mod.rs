/// Redis integration: one shared connection for the whole process
///
/// This module provides:
/// - Connection configuration from environment variables
/// - A connection factory that opens the reconnecting handle
/// - The shared connection manager with set/get/del/exists/ping
/// - Connect/error observation and one-time shutdown
///
/// # Architecture
///
/// ```text
/// ConnectionConfig::build()  (REDIS_HOST, REDIS_PORT, REDIS_PASSWORD)
///        │
///        │ config::connect()
///        ▼
///  RedisConnection ──on_connect/on_error──> ConnectionObserver (logs)
///        │
///        │ owned by
///        ▼
///   RedisService  <── set/get/del/exists ── application
///        ▲
///        └──────────── ping ─────────────── RedisHealthIndicator
/// ```
///
/// # Example
///
/// ```no_run
/// use kvlink_shared::redis::{ConnectionConfig, RedisService};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ConnectionConfig::build()?;
/// let redis = RedisService::connect(config).await?;
///
/// let pong = redis.ping().await?;
/// println!("Redis says: {}", pong);
/// # Ok(())
/// # }
/// ```

pub mod config;
pub mod handle;
pub mod memory;
pub mod service;

// Re-export common types for convenience
pub use config::{connect, ConnectionConfig};
pub use handle::{ConnectionHandle, ConnectionObserver, RedisConnection, TracingObserver};
pub use memory::MemoryConnection;
pub use service::{RedisService, RedisServiceError};
