/// Connection factory for the shared Redis handle
///
/// This module turns environment configuration into a [`ConnectionConfig`]
/// and opens the one long-lived connection described by it.
///
/// # Environment Variables
///
/// - `REDIS_HOST`: Redis host (default: localhost)
/// - `REDIS_PORT`: Redis port (default: 6379)
/// - `REDIS_PASSWORD`: Redis password (optional, omitted when unset or empty)
///
/// The connect timeout (10s) and the per-request retry budget (3) are fixed.
///
/// # Example
///
/// ```no_run
/// use kvlink_shared::redis::config::{connect, ConnectionConfig};
/// use kvlink_shared::redis::handle::TracingObserver;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ConnectionConfig::build()?;
/// let handle = connect(&config, Arc::new(TracingObserver)).await?;
/// # Ok(())
/// # }
/// ```

use crate::redis::handle::{ConnectionObserver, RedisConnection};
use crate::redis::service::RedisServiceError;
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default Redis host
pub const DEFAULT_HOST: &str = "localhost";

/// Default Redis port
pub const DEFAULT_PORT: u16 = 6379;

/// Connect timeout applied to the initial handshake, in milliseconds
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Reconnect attempts the connection manager makes per failed request
pub const MAX_RETRIES_PER_REQUEST: u32 = 3;

/// Redis connection parameters
///
/// `password` is `None` when no password is configured and is then left out
/// of the serialized form entirely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Redis host
    pub host: String,

    /// Redis port
    pub port: u16,

    /// Optional AUTH password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Reconnect attempts per failed request
    pub max_retries_per_request: u32,
}

impl ConnectionConfig {
    /// Builds the configuration from the process environment
    ///
    /// Loads `.env` if present, then reads `REDIS_HOST`, `REDIS_PORT` and
    /// `REDIS_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns [`RedisServiceError::Config`] if `REDIS_PORT` is not a valid port.
    pub fn build() -> Result<Self, RedisServiceError> {
        // Load .env if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns [`RedisServiceError::Config`] if `REDIS_PORT` is not a valid port.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RedisServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("REDIS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("REDIS_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                RedisServiceError::Config(format!("REDIS_PORT must be a valid port, got {:?}", raw))
            })?,
            None => DEFAULT_PORT,
        };

        let password = lookup("REDIS_PASSWORD").filter(|p| !p.is_empty());

        Ok(Self {
            host,
            port,
            password,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            max_retries_per_request: MAX_RETRIES_PER_REQUEST,
        })
    }

    /// Returns `host:port` for logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Converts into the redis crate's connection info
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            max_retries_per_request: MAX_RETRIES_PER_REQUEST,
        }
    }
}

// Password never reaches the logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("max_retries_per_request", &self.max_retries_per_request)
            .finish()
    }
}

/// Opens a new connection handle for `config`
///
/// The connection manager reconnects on its own after the initial handshake,
/// retrying each failed request up to `max_retries_per_request` times.
/// `observer` is told about the successful connect and every later
/// transport error.
///
/// # Errors
///
/// Returns the client's error as-is if the handshake fails, or
/// [`RedisServiceError::Timeout`] if it does not finish within
/// `connect_timeout_ms`.
pub async fn connect(
    config: &ConnectionConfig,
    observer: Arc<dyn ConnectionObserver>,
) -> Result<RedisConnection, RedisServiceError> {
    let client = Client::open(config.connection_info())?;

    let manager = tokio::time::timeout(
        config.connect_timeout(),
        ConnectionManager::new_with_backoff(
            client,
            2,
            100,
            config.max_retries_per_request as usize,
        ),
    )
    .await
    .map_err(|_| {
        RedisServiceError::Timeout(format!(
            "connect to {} timed out after {}ms",
            config.address(),
            config.connect_timeout_ms
        ))
    })??;

    observer.on_connect(&config.address());

    Ok(RedisConnection::new(manager, observer))
}
