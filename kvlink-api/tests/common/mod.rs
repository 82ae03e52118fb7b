/// Common test utilities for integration tests
///
/// Builds the full router on top of an in-memory Redis handle so the HTTP
/// surface can be exercised without a running server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use kvlink_api::app::{build_router, AppState};
use kvlink_api::config::{ApiConfig, Config};
use kvlink_shared::redis::{ConnectionConfig, MemoryConnection, RedisService};
use std::sync::Arc;
use tower::Service as _;

/// Test context containing all necessary resources
pub struct TestContext {
    pub redis: Arc<RedisService>,
    pub store: Arc<MemoryConnection>,
    pub app: axum::Router,
}

impl TestContext {
    /// Creates a new test context over a fresh in-memory store
    pub fn new() -> Self {
        let store = Arc::new(MemoryConnection::new());
        let redis = Arc::new(RedisService::from_handle(store.clone()));

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            redis: ConnectionConfig::default(),
        };

        let app = build_router(AppState::new(Arc::clone(&redis), config));

        Self { redis, store, app }
    }

    /// Sends a GET request and returns status and parsed JSON body
    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap();

        (status, json)
    }
}
