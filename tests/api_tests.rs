//! Integration tests for the HTTP decision surface
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use siskin::api::{self, paths};
use siskin::error::Result;
use siskin::limiters::{RateLimiter, RatePolicy, WindowPolicy};
use siskin::store::{CounterStore, MemoryStore};
use siskin::store_error;

fn test_app(limit: u32) -> axum::Router {
    let limiter = RateLimiter::new(
        Arc::new(MemoryStore::new()),
        RatePolicy::FixedWindow(WindowPolicy {
            limit,
            window: Duration::from_secs(60),
        }),
    );
    api::api(limiter).unwrap()
}

fn limit_request(client_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(paths::limit_path(client_id))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app(1);
    let response = app
        .oneshot(
            Request::builder()
                .uri(paths::base::HEALTH)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admitted_request_returns_the_decision() {
    let app = test_app(5);
    let response = app.oneshot(limit_request("alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let decision: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(decision["client_id"], "alice");
    assert_eq!(decision["allowed"], true);
}

#[tokio::test]
async fn exhausted_client_gets_429() {
    let app = test_app(2);
    for _ in 0..2 {
        let response = app.clone().oneshot(limit_request("alice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(limit_request("alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // a different client id is still admitted
    let response = app.oneshot(limit_request("bob")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn policy_endpoint_reports_the_active_policy() {
    let app = test_app(7);
    let response = app
        .oneshot(
            Request::builder()
                .uri(paths::rate_limits::POLICY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let policy: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(policy["algorithm"], "fixed-window");
    assert_eq!(policy["limit"], 7);
}

/// A store with no backend behind it: every operation fails.
struct DownStore;

#[async_trait]
impl CounterStore for DownStore {
    async fn increment(&self, _key: &str) -> Result<i64> {
        Err(store_error!("connection refused"))
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        Err(store_error!("connection refused"))
    }
    async fn get_counter(&self, _key: &str) -> Result<Option<i64>> {
        Err(store_error!("connection refused"))
    }
    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(store_error!("connection refused"))
    }
    async fn sorted_set_add(&self, _key: &str, _score: i64, _member: &str) -> Result<()> {
        Err(store_error!("connection refused"))
    }
    async fn sorted_set_remove_range(&self, _key: &str, _min: i64, _max: i64) -> Result<u64> {
        Err(store_error!("connection refused"))
    }
    async fn sorted_set_len(&self, _key: &str) -> Result<u64> {
        Err(store_error!("connection refused"))
    }
    async fn hash_get_multi(&self, _key: &str, _fields: &[&str]) -> Result<Vec<Option<String>>> {
        Err(store_error!("connection refused"))
    }
    async fn hash_set_multi(&self, _key: &str, _entries: &[(&str, String)]) -> Result<()> {
        Err(store_error!("connection refused"))
    }
}

#[tokio::test]
async fn store_outage_fails_closed_with_503() {
    let limiter = RateLimiter::new(
        Arc::new(DownStore),
        RatePolicy::FixedWindow(WindowPolicy {
            limit: 5,
            window: Duration::from_secs(60),
        }),
    );
    let app = api::api(limiter).unwrap();

    let response = app.oneshot(limit_request("alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
