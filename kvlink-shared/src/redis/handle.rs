/// Connection handle abstraction and the Redis-backed implementation
///
/// [`ConnectionHandle`] is the seam between [`RedisService`] and the store:
/// the production implementation is [`RedisConnection`], which wraps the
/// redis crate's `ConnectionManager`; tests use the in-memory handle from
/// [`crate::redis::memory`].
///
/// Transport events are reported through a [`ConnectionObserver`]:
/// `on_connect` once the handshake succeeds and `on_error` for every
/// connection-level failure seen afterwards. The default observer,
/// [`TracingObserver`], only logs.
///
/// [`RedisService`]: crate::redis::service::RedisService

use crate::redis::service::RedisServiceError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::sync::{Arc, Mutex};

/// Receives connection lifecycle events from a handle
pub trait ConnectionObserver: Send + Sync {
    /// Called once the connection to `address` is established
    fn on_connect(&self, address: &str);

    /// Called for each transport error; must not panic
    fn on_error(&self, error: &RedisError);
}

/// Observer that logs connection events via `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ConnectionObserver for TracingObserver {
    fn on_connect(&self, address: &str) {
        tracing::info!("Connected to Redis at {}", address);
    }

    fn on_error(&self, error: &RedisError) {
        tracing::error!(error = %error, "Redis connection error");
    }
}

/// Low-level operations on a live store connection
///
/// Implementations must be safe to share between concurrent callers.
/// After [`disconnect`](ConnectionHandle::disconnect) every operation
/// fails with [`RedisServiceError::Closed`].
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// SET key value
    async fn set(&self, key: &str, value: &str) -> Result<(), RedisServiceError>;

    /// SETEX key seconds value
    async fn set_ex(&self, key: &str, value: &str, seconds: u64)
        -> Result<(), RedisServiceError>;

    /// GET key
    async fn get(&self, key: &str) -> Result<Option<String>, RedisServiceError>;

    /// DEL key
    async fn del(&self, key: &str) -> Result<i64, RedisServiceError>;

    /// EXISTS key
    async fn exists(&self, key: &str) -> Result<i64, RedisServiceError>;

    /// PING
    async fn ping(&self) -> Result<String, RedisServiceError>;

    /// Closes the connection
    fn disconnect(&self);
}

/// Redis connection backed by `redis::aio::ConnectionManager`
///
/// The manager multiplexes concurrent requests over one socket and
/// reconnects on its own. The slot holding it is only locked long enough to
/// clone the manager, never across a request.
pub struct RedisConnection {
    manager: Mutex<Option<ConnectionManager>>,
    observer: Arc<dyn ConnectionObserver>,
}

impl RedisConnection {
    /// Wraps an established connection manager
    pub fn new(manager: ConnectionManager, observer: Arc<dyn ConnectionObserver>) -> Self {
        Self {
            manager: Mutex::new(Some(manager)),
            observer,
        }
    }

    fn manager(&self) -> Result<ConnectionManager, RedisServiceError> {
        self.manager
            .lock()
            .map_err(|_| RedisServiceError::Closed)?
            .clone()
            .ok_or(RedisServiceError::Closed)
    }

    /// Reports connection-level failures to the observer before returning them
    fn observe<T>(&self, result: Result<T, RedisError>) -> Result<T, RedisServiceError> {
        result.map_err(|err| {
            report_error(self.observer.as_ref(), &err);
            RedisServiceError::from(err)
        })
    }
}

/// Forwards `err` to `observer` if it is a transport error
fn report_error(observer: &dyn ConnectionObserver, err: &RedisError) {
    if is_transport_error(err) {
        observer.on_error(err);
    }
}

fn is_transport_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

#[async_trait]
impl ConnectionHandle for RedisConnection {
    async fn set(&self, key: &str, value: &str) -> Result<(), RedisServiceError> {
        let mut conn = self.manager()?;
        let result: Result<(), RedisError> = conn.set(key, value).await;
        self.observe(result)
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        seconds: u64,
    ) -> Result<(), RedisServiceError> {
        let mut conn = self.manager()?;
        let result: Result<(), RedisError> = redis::cmd("SETEX")
            .arg(key)
            .arg(seconds)
            .arg(value)
            .query_async(&mut conn)
            .await;
        self.observe(result)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, RedisServiceError> {
        let mut conn = self.manager()?;
        let result: Result<Option<String>, RedisError> = conn.get(key).await;
        self.observe(result)
    }

    async fn del(&self, key: &str) -> Result<i64, RedisServiceError> {
        let mut conn = self.manager()?;
        let result: Result<i64, RedisError> = conn.del(key).await;
        self.observe(result)
    }

    async fn exists(&self, key: &str) -> Result<i64, RedisServiceError> {
        let mut conn = self.manager()?;
        let result: Result<i64, RedisError> = conn.exists(key).await;
        self.observe(result)
    }

    async fn ping(&self) -> Result<String, RedisServiceError> {
        let mut conn = self.manager()?;
        let result: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        self.observe(result)
    }

    fn disconnect(&self) {
        // Dropping the last manager clone closes the socket.
        if let Ok(mut slot) = self.manager.lock() {
            slot.take();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Observer that records every event it receives
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        pub(crate) connects: Mutex<Vec<String>>,
        pub(crate) errors: Mutex<Vec<String>>,
    }

    impl ConnectionObserver for RecordingObserver {
        fn on_connect(&self, address: &str) {
            self.connects.lock().unwrap().push(address.to_string());
        }

        fn on_error(&self, error: &RedisError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn test_transport_errors_reach_observer() {
        let observer = RecordingObserver::default();
        let refused = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));

        report_error(&observer, &refused);

        let errors = observer.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("connection refused"));
    }

    #[test]
    fn test_response_errors_skip_observer() {
        let observer = RecordingObserver::default();
        let response = RedisError::from((redis::ErrorKind::ResponseError, "WRONGTYPE"));

        report_error(&observer, &response);

        assert!(observer.errors.lock().unwrap().is_empty());
        assert!(observer.connects.lock().unwrap().is_empty());
    }

    #[test]
    fn test_transport_error_classification() {
        let io = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let response = RedisError::from((redis::ErrorKind::ResponseError, "WRONGTYPE"));

        assert!(is_transport_error(&io));
        assert!(!is_transport_error(&response));
    }

    #[test]
    fn test_tracing_observer_does_not_panic() {
        let observer = TracingObserver;
        observer.on_connect("localhost:6379");
        observer.on_error(&RedisError::from((redis::ErrorKind::IoError, "broken pipe")));
    }
}
