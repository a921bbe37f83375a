//! Token lifecycle behavior against a local mock API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Method;
use serde_json::json;

use personio_export::api::ApiError;

use crate::support::api::{auth_handler, gateway_for, page_body, spawn};

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn test_token_is_cached_across_calls() {
    let auth_calls = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls.clone()))
        .route(
            "/v1/company/employees",
            get(|| async { Json(page_body(vec![json!({"id": 1})], 1, 1)) }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    for _ in 0..3 {
        gateway
            .request(Method::GET, "company/employees", &[])
            .await
            .unwrap();
    }

    // One exchange serves all three requests
    assert_eq!(auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_401_triggers_exactly_one_refresh_and_retry() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let endpoint_hits = Arc::new(AtomicUsize::new(0));

    let hits = endpoint_hits.clone();
    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls.clone()))
        .route(
            "/v1/company/employees",
            get(move |headers: HeaderMap| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    // The first issued token is stale; only its successor works
                    if bearer(&headers) == "Bearer token-1" {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(page_body(vec![json!({"id": 1})], 1, 1)))
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let body = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap();

    assert_eq!(body["data"][0]["id"], 1);
    assert_eq!(auth_calls.load(Ordering::SeqCst), 2);
    assert_eq!(endpoint_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_persistent_401_fails_without_refresh_loop() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let endpoint_hits = Arc::new(AtomicUsize::new(0));

    let hits = endpoint_hits.clone();
    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls.clone()))
        .route(
            "/v1/company/employees",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::UNAUTHORIZED
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let err = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, .. }));
    // Exactly one refresh, one retried call, no unbounded loop
    assert_eq!(auth_calls.load(Ordering::SeqCst), 2);
    assert_eq!(endpoint_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_auth_failure_is_fatal_and_not_retried() {
    let auth_calls = Arc::new(AtomicUsize::new(0));

    let calls = auth_calls.clone();
    let router = Router::new()
        .route(
            "/v1/auth",
            post(move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }),
        )
        .route(
            "/v1/company/employees",
            get(|| async { Json(page_body(vec![], 1, 1)) }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let err = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Authentication(_)));
    assert_eq!(auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_auth_payload_is_authentication_error() {
    let router = Router::new()
        .route(
            "/v1/auth",
            post(|| async { Json(json!({"data": {"unexpected": true}})) }),
        )
        .route(
            "/v1/company/employees",
            get(|| async { Json(page_body(vec![], 1, 1)) }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let err = gateway
        .request(Method::GET, "company/employees", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Authentication(_)));
}
