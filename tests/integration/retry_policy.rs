//! Retry and backoff behavior against a local mock API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Method;
use serde_json::json;

use personio_export::api::ApiError;

use crate::support::api::{auth_handler, gateway_for, page_body, spawn};

fn counting_route<F>(hits: Arc<AtomicUsize>, respond: F) -> axum::routing::MethodRouter
where
    F: Fn(usize) -> axum::response::Response + Clone + Send + Sync + 'static,
{
    get(move || {
        let hits = hits.clone();
        let respond = respond.clone();
        async move {
            let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
            respond(n)
        }
    })
}

#[tokio::test]
async fn test_429_honors_retry_after_hint() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            counting_route(hits.clone(), |n| {
                if n == 1 {
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        [(header::RETRY_AFTER, "2")],
                        "rate limited",
                    )
                        .into_response()
                } else {
                    Json(page_body(vec![json!({"id": 1})], 1, 1)).into_response()
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let started = Instant::now();
    let body = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap();

    assert_eq!(body["data"][0]["id"], 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // The next attempt waits at least the hinted two seconds
    assert!(started.elapsed().as_secs_f64() >= 2.0);
}

#[tokio::test]
async fn test_429_exhaustion_raises_api_error_without_further_attempts() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            counting_route(hits.clone(), |_| {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, "1")],
                    "rate limited",
                )
                    .into_response()
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 2);
    let err = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 429, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_server_errors_retry_until_attempts_exhausted() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            counting_route(hits.clone(), |_| {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 3);
    let err = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_transient_failure_recovers_silently() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            counting_route(hits.clone(), |n| {
                if n == 1 {
                    StatusCode::BAD_GATEWAY.into_response()
                } else {
                    Json(page_body(vec![json!({"id": 7})], 1, 1)).into_response()
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let body = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap();

    assert_eq!(body["data"][0]["id"], 7);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_non_retryable_client_error_fails_immediately() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            counting_route(hits.clone(), |_| StatusCode::NOT_FOUND.into_response()),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let err = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, endpoint } => {
            assert_eq!(status, 404);
            assert_eq!(endpoint, "company/employees");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
