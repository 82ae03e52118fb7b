/// In-memory connection handle
///
/// [`MemoryConnection`] implements [`ConnectionHandle`] over a `HashMap`,
/// honoring TTLs with `tokio::time::Instant` so tests can drive expiry with
/// a paused clock. It can also be told to answer PING with something other
/// than `PONG` or to fail every command, which is how the health and
/// routing tests simulate a broken store.
///
/// # Example
///
/// ```
/// use kvlink_shared::redis::{MemoryConnection, RedisService};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let redis = RedisService::from_handle(Arc::new(MemoryConnection::new()));
/// redis.set("k", "v", None).await.unwrap();
/// assert_eq!(redis.get("k").await.unwrap().as_deref(), Some("v"));
/// # }
/// ```

use crate::redis::handle::ConnectionHandle;
use crate::redis::service::RedisServiceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    ping_reply: Option<String>,
    failure: Option<String>,
    closed: bool,
}

/// Connection handle that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryConnection {
    state: Mutex<State>,
    disconnects: AtomicUsize,
}

impl MemoryConnection {
    /// Creates an empty store that answers PING with `PONG`
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes PING answer `reply` instead of `PONG`
    pub fn set_ping_reply(&self, reply: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.ping_reply = Some(reply.into());
        }
    }

    /// Makes every command fail with a connection error carrying `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = Some(message.into());
        }
    }

    /// Clears a failure set by [`fail_with`](Self::fail_with)
    pub fn recover(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = None;
        }
    }

    /// Number of times `disconnect` has been called
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Locks the state, failing if the handle is closed or set to fail
    fn open(&self) -> Result<MutexGuard<'_, State>, RedisServiceError> {
        let state = self
            .state
            .lock()
            .map_err(|_| RedisServiceError::Connection("memory store poisoned".to_string()))?;

        if state.closed {
            return Err(RedisServiceError::Closed);
        }
        if let Some(message) = &state.failure {
            return Err(RedisServiceError::Connection(message.clone()));
        }

        Ok(state)
    }

    fn insert(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), RedisServiceError> {
        let mut state = self.open()?;
        let expires_at = match ttl {
            Some(ttl) => Some(Instant::now().checked_add(ttl).ok_or_else(invalid_expire_time)?),
            None => None,
        };
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    /// Removes `key` if it has expired, returning the live entry otherwise
    fn live_entry(state: &mut State, key: &str) -> Option<Entry> {
        let now = Instant::now();
        match state.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }
}

fn invalid_expire_time() -> RedisServiceError {
    RedisServiceError::Command("ERR invalid expire time in 'setex' command".to_string())
}

#[async_trait]
impl ConnectionHandle for MemoryConnection {
    async fn set(&self, key: &str, value: &str) -> Result<(), RedisServiceError> {
        self.insert(key, value, None)
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        seconds: u64,
    ) -> Result<(), RedisServiceError> {
        if seconds == 0 {
            return Err(invalid_expire_time());
        }
        self.insert(key, value, Some(Duration::from_secs(seconds)))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, RedisServiceError> {
        let mut state = self.open()?;
        Ok(Self::live_entry(&mut state, key).map(|entry| entry.value))
    }

    async fn del(&self, key: &str) -> Result<i64, RedisServiceError> {
        let mut state = self.open()?;
        let removed = Self::live_entry(&mut state, key).is_some();
        state.entries.remove(key);
        Ok(i64::from(removed))
    }

    async fn exists(&self, key: &str) -> Result<i64, RedisServiceError> {
        let mut state = self.open()?;
        Ok(i64::from(Self::live_entry(&mut state, key).is_some()))
    }

    async fn ping(&self) -> Result<String, RedisServiceError> {
        let state = self.open()?;
        Ok(state
            .ping_reply
            .clone()
            .unwrap_or_else(|| "PONG".to_string()))
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
            state.entries.clear();
        }
    }
}
