/// Health reporting for the shared Redis connection
///
/// A [`HealthIndicator`] answers "is this dependency reachable" with either
/// `Ok(HealthStatus)` or `Err(CheckError)`; the error carries the unhealthy
/// status so callers always get a message. [`HealthCheckService`] runs a set
/// of named indicators and folds their results into a [`HealthReport`].
///
/// # Report Shape
///
/// ```json
/// {
///   "status": "error",
///   "info": {},
///   "error": { "redis": { "status": "down", "message": "connection refused" } },
///   "details": { "redis": { "status": "down", "message": "connection refused" } }
/// }
/// ```
///
/// # Example
///
/// ```no_run
/// use kvlink_shared::health::{HealthCheckService, RedisHealthIndicator};
/// use kvlink_shared::redis::{ConnectionConfig, RedisService};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let redis = Arc::new(RedisService::connect(ConnectionConfig::build()?).await?);
/// let health = HealthCheckService::new()
///     .with_check("redis", Arc::new(RedisHealthIndicator::new(redis)));
///
/// let report = health.check().await;
/// println!("healthy: {}", report.is_healthy());
/// # Ok(())
/// # }
/// ```

use crate::redis::RedisService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Reply a healthy Redis gives to PING
pub const PONG: &str = "PONG";

/// Fallback message when an error has no description
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Result of probing one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Name the check is reported under
    pub key: String,

    /// Whether the dependency answered as expected
    pub healthy: bool,

    /// Human-readable detail
    pub message: String,
}

impl HealthStatus {
    /// Healthy status for `key`
    pub fn up(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            healthy: true,
            message: message.into(),
        }
    }

    /// Unhealthy status for `key`
    pub fn down(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            healthy: false,
            message: message.into(),
        }
    }
}

/// A failed health check, carrying the unhealthy status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{check} check failed: {}", .status.message)]
pub struct CheckError {
    /// Which dependency failed (e.g. "Redis")
    pub check: String,

    /// The unhealthy status to report
    pub status: HealthStatus,
}

/// A single dependency probe
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    /// Probes the dependency once and reports under `key`
    async fn check_health(&self, key: &str) -> Result<HealthStatus, CheckError>;
}

/// Health indicator backed by the shared Redis connection's PING
pub struct RedisHealthIndicator {
    redis: Arc<RedisService>,
}

impl RedisHealthIndicator {
    /// Creates an indicator that pings through `redis`
    pub fn new(redis: Arc<RedisService>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl HealthIndicator for RedisHealthIndicator {
    /// Sends one PING
    ///
    /// - `PONG` → healthy, "Redis is available"
    /// - any other reply → `CheckError`, "Redis is not responding"
    /// - an error → `CheckError` with the error's message
    async fn check_health(&self, key: &str) -> Result<HealthStatus, CheckError> {
        let status = match self.redis.ping().await {
            Ok(reply) if reply == PONG => {
                tracing::debug!("Redis health check: PONG received");
                return Ok(HealthStatus::up(key, "Redis is available"));
            }
            Ok(other) => {
                tracing::warn!("Redis health check: unexpected response: {}", other);
                HealthStatus::down(key, "Redis is not responding")
            }
            Err(e) => {
                tracing::error!("Redis health check failed: {}", e);
                let message = e.to_string();
                if message.is_empty() {
                    HealthStatus::down(key, UNKNOWN_ERROR)
                } else {
                    HealthStatus::down(key, message)
                }
            }
        };

        Err(CheckError {
            check: "Redis".to_string(),
            status,
        })
    }
}

/// Overall outcome of a health report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Every check passed
    Ok,

    /// At least one check failed
    Error,
}

/// State of one dependency inside a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    /// Reachable
    Up,

    /// Unreachable or misbehaving
    Down,
}

/// One dependency entry inside a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Up or down
    pub status: ComponentState,

    /// Detail from the indicator
    pub message: String,
}

impl From<&HealthStatus> for ComponentHealth {
    fn from(status: &HealthStatus) -> Self {
        Self {
            status: if status.healthy {
                ComponentState::Up
            } else {
                ComponentState::Down
            },
            message: status.message.clone(),
        }
    }
}

/// Aggregated health of every registered check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `ok` when every check passed
    pub status: OverallStatus,

    /// Passing checks
    pub info: BTreeMap<String, ComponentHealth>,

    /// Failing checks
    pub error: BTreeMap<String, ComponentHealth>,

    /// All checks
    pub details: BTreeMap<String, ComponentHealth>,
}

impl HealthReport {
    /// Whether every check passed
    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Ok
    }
}

/// Runs named health indicators and aggregates their results
#[derive(Default, Clone)]
pub struct HealthCheckService {
    checks: Vec<(String, Arc<dyn HealthIndicator>)>,
}

impl HealthCheckService {
    /// Creates a service with no checks
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `indicator` under `key`
    pub fn with_check(mut self, key: impl Into<String>, indicator: Arc<dyn HealthIndicator>) -> Self {
        self.checks.push((key.into(), indicator));
        self
    }

    /// Runs every check once and builds the report
    pub async fn check(&self) -> HealthReport {
        let mut info = BTreeMap::new();
        let mut error = BTreeMap::new();
        let mut details = BTreeMap::new();

        for (key, indicator) in &self.checks {
            let status = match indicator.check_health(key).await {
                Ok(status) => status,
                Err(e) => e.status,
            };

            let component = ComponentHealth::from(&status);
            if status.healthy {
                info.insert(status.key.clone(), component.clone());
            } else {
                error.insert(status.key.clone(), component.clone());
            }
            details.insert(status.key, component);
        }

        let status = if error.is_empty() {
            OverallStatus::Ok
        } else {
            OverallStatus::Error
        };

        HealthReport {
            status,
            info,
            error,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::MemoryConnection;

    fn indicator() -> (RedisHealthIndicator, Arc<MemoryConnection>) {
        let conn = Arc::new(MemoryConnection::new());
        let redis = Arc::new(RedisService::from_handle(conn.clone()));
        (RedisHealthIndicator::new(redis), conn)
    }

    #[tokio::test]
    async fn test_healthy_on_pong() {
        let (indicator, _) = indicator();

        let status = indicator.check_health("redis").await.unwrap();
        assert_eq!(status, HealthStatus::up("redis", "Redis is available"));
    }

    #[tokio::test]
    async fn test_unexpected_reply_is_check_failure() {
        let (indicator, conn) = indicator();
        conn.set_ping_reply("LOADING");

        let err = indicator.check_health("redis").await.unwrap_err();
        assert_eq!(err.status, HealthStatus::down("redis", "Redis is not responding"));
        assert_eq!(err.to_string(), "Redis check failed: Redis is not responding");
    }

    #[tokio::test]
    async fn test_ping_error_message_is_reported() {
        let (indicator, conn) = indicator();
        conn.fail_with("connection refused");

        let err = indicator.check_health("redis").await.unwrap_err();
        assert!(!err.status.healthy);
        assert_eq!(err.status.message, "connection refused");
        assert_eq!(err.status.key, "redis");
    }

    #[tokio::test]
    async fn test_empty_error_message_falls_back() {
        let (indicator, conn) = indicator();
        conn.fail_with("");

        let err = indicator.check_health("redis").await.unwrap_err();
        assert_eq!(err.status.message, UNKNOWN_ERROR);
    }

    #[tokio::test]
    async fn test_closed_connection_is_unhealthy() {
        let conn = Arc::new(MemoryConnection::new());
        let redis = Arc::new(RedisService::from_handle(conn));
        redis.shutdown();

        let err = RedisHealthIndicator::new(redis)
            .check_health("redis")
            .await
            .unwrap_err();
        assert_eq!(err.status.message, "Redis connection is closed");
    }

    #[tokio::test]
    async fn test_report_all_healthy() {
        let (indicator, _) = indicator();
        let service = HealthCheckService::new().with_check("redis", Arc::new(indicator));

        let report = service.check().await;

        assert!(report.is_healthy());
        assert!(report.error.is_empty());
        assert_eq!(report.info["redis"].status, ComponentState::Up);
        assert_eq!(report.details.len(), 1);
    }

    #[tokio::test]
    async fn test_report_with_failure() {
        let (indicator, conn) = indicator();
        conn.fail_with("connection refused");
        let service = HealthCheckService::new().with_check("redis", Arc::new(indicator));

        let report = service.check().await;

        assert!(!report.is_healthy());
        assert!(report.info.is_empty());
        assert_eq!(report.error["redis"].message, "connection refused");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["details"]["redis"]["status"], "down");
    }

    #[tokio::test]
    async fn test_empty_service_is_healthy() {
        let report = HealthCheckService::new().check().await;
        assert!(report.is_healthy());
        assert!(report.details.is_empty());
    }
}
