/// Integration tests for the KvLink API
///
/// These drive the real router against an in-memory Redis handle:
/// - Healthy store → 200 with `status: ok`
/// - Unexpected PING reply or PING error → 503 with the failing check
/// - Shutdown closes the shared connection exactly once

mod common;

use axum::http::StatusCode;
use common::TestContext;

#[tokio::test]
async fn test_health_ok() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["info"]["redis"]["status"], "up");
    assert_eq!(body["info"]["redis"]["message"], "Redis is available");
    assert!(body["error"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_unexpected_ping_reply() {
    let ctx = TestContext::new();
    ctx.store.set_ping_reply("LOADING");

    let (status, body) = ctx.get("/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["redis"]["status"], "down");
    assert_eq!(body["error"]["redis"]["message"], "Redis is not responding");
}

#[tokio::test]
async fn test_health_store_unreachable() {
    let ctx = TestContext::new();
    ctx.store.fail_with("connection refused");

    let (status, body) = ctx.get("/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["details"]["redis"]["message"], "connection refused");
}

#[tokio::test]
async fn test_health_recovers() {
    let ctx = TestContext::new();
    ctx.store.fail_with("connection reset by peer");

    let (status, _) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    ctx.store.recover();

    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_health_after_shutdown() {
    let ctx = TestContext::new();

    ctx.redis.shutdown();
    ctx.redis.shutdown();
    assert_eq!(ctx.store.disconnect_count(), 1);

    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["redis"]["message"], "Redis connection is closed");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/v1/nothing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "No route for /v1/nothing");
}

#[tokio::test]
async fn test_operations_through_shared_service() {
    let ctx = TestContext::new();

    ctx.redis.set("greeting", "hello", None).await.unwrap();
    assert_eq!(ctx.redis.get("greeting").await.unwrap().as_deref(), Some("hello"));
    assert_eq!(ctx.redis.exists("greeting").await.unwrap(), 1);
    assert_eq!(ctx.redis.del("greeting").await.unwrap(), 1);
    assert_eq!(ctx.redis.del("greeting").await.unwrap(), 0);
}
