/// Shared Redis connection manager
///
/// [`RedisService`] owns the single connection handle used by the whole
/// process and exposes a small typed surface over it:
/// - `set` / `get` / `del` / `exists` for opaque string values
/// - `ping` for liveness
/// - `shutdown` for a one-time, idempotent disconnect
///
/// Every operation is a pass-through to the handle. There is no caching,
/// batching or retrying here; reconnects and per-request retries are the
/// connection manager's job.
///
/// Create one instance at startup, wrap it in an `Arc` and hand it to
/// whatever needs the store.
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
/// redis.set("greeting", "hello", Some(60)).await?;
/// assert_eq!(redis.get("greeting").await?.as_deref(), Some("hello"));
///
/// redis.shutdown();
/// # Ok(())
/// # }
/// ```

use crate::redis::config::{self, ConnectionConfig};
use crate::redis::handle::{ConnectionHandle, ConnectionObserver, TracingObserver};
use redis::RedisError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Redis service errors
#[derive(Error, Debug)]
pub enum RedisServiceError {
    /// Configuration error
    #[error("Redis configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("{0}")]
    Connection(String),

    /// Command execution error
    #[error("{0}")]
    Command(String),

    /// Connect or command timeout
    #[error("Redis timeout: {0}")]
    Timeout(String),

    /// The handle has been shut down
    #[error("Redis connection is closed")]
    Closed,
}

impl From<RedisError> for RedisServiceError {
    fn from(err: RedisError) -> Self {
        if err.is_timeout() {
            RedisServiceError::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            RedisServiceError::Connection(err.to_string())
        } else {
            RedisServiceError::Command(err.to_string())
        }
    }
}

/// Owner of the process-wide Redis connection
pub struct RedisService {
    handle: Arc<dyn ConnectionHandle>,
    closed: AtomicBool,
}

impl RedisService {
    /// Connects using `config` and logs connection events via `tracing`
    ///
    /// # Errors
    ///
    /// Returns the connection error if the handle cannot be created. The
    /// failure is logged before it is returned.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, RedisServiceError> {
        Self::connect_with_observer(config, Arc::new(TracingObserver)).await
    }

    /// Connects using `config`, reporting connection events to `observer`
    ///
    /// # Errors
    ///
    /// Returns the connection error if the handle cannot be created.
    pub async fn connect_with_observer(
        config: ConnectionConfig,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Self, RedisServiceError> {
        match config::connect(&config, observer).await {
            Ok(connection) => Ok(Self::from_handle(Arc::new(connection))),
            Err(e) => {
                tracing::error!(
                    address = %config.address(),
                    error = %e,
                    "Failed to initialize Redis connection"
                );
                Err(e)
            }
        }
    }

    /// Takes ownership of an already open handle
    pub fn from_handle(handle: Arc<dyn ConnectionHandle>) -> Self {
        Self {
            handle,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the underlying handle for commands outside this facade
    pub fn connection(&self) -> Arc<dyn ConnectionHandle> {
        Arc::clone(&self.handle)
    }

    /// Stores `value` under `key`, overwriting any previous value
    ///
    /// With a positive `ttl_seconds` the key expires after that many seconds;
    /// with `None` or `Some(0)` it never expires.
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<(), RedisServiceError> {
        match ttl_seconds {
            Some(ttl) if ttl > 0 => self.handle.set_ex(key, value, ttl).await,
            _ => self.handle.set(key, value).await,
        }
    }

    /// Returns the value under `key`, or `None` if it is missing or expired
    pub async fn get(&self, key: &str) -> Result<Option<String>, RedisServiceError> {
        self.handle.get(key).await
    }

    /// Deletes `key`, returning how many keys were removed (0 or 1)
    pub async fn del(&self, key: &str) -> Result<i64, RedisServiceError> {
        self.handle.del(key).await
    }

    /// Returns 1 if `key` exists, 0 otherwise
    pub async fn exists(&self, key: &str) -> Result<i64, RedisServiceError> {
        self.handle.exists(key).await
    }

    /// Sends PING; a healthy server answers `"PONG"`
    pub async fn ping(&self) -> Result<String, RedisServiceError> {
        self.handle.ping().await
    }

    /// Whether `shutdown` has already run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Disconnects the handle
    ///
    /// Only the first call disconnects; later calls do nothing.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Redis connection already closed");
            return;
        }

        self.handle.disconnect();
        tracing::info!("Disconnected from Redis");
    }
}

impl Drop for RedisService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
