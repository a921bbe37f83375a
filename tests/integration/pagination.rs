//! Pagination traversal against a local mock API

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::json;

use crate::support::api::{auth_handler, gateway_for, page_body, spawn};

#[tokio::test]
async fn test_traverses_all_pages_in_server_order() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let route_hits = hits.clone();
    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = route_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let page: u64 = params
                        .get("page")
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(1);
                    let records = match page {
                        1 => vec![json!({"id": 1}), json!({"id": 2})],
                        2 => vec![json!({"id": 3}), json!({"id": 4})],
                        _ => vec![json!({"id": 5})],
                    };
                    Json(page_body(records, page, 3))
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let mut pages = gateway.paginate("company/employees", &[]);

    let mut ids = Vec::new();
    while let Some(page) = pages.next().await {
        let page = page.unwrap();
        for record in page.records {
            ids.push(record["id"].as_u64().unwrap());
        }
    }

    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_empty_first_page_ends_stream() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let route_hits = hits.clone();
    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            get(move || {
                let hits = route_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(page_body(vec![], 1, 1))
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let mut pages = gateway.paginate("company/employees", &[]);

    assert!(pages.next().await.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_response_without_metadata_is_single_page() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));

    let route_hits = hits.clone();
    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            get(move || {
                let hits = route_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"data": [{"id": 1}]}))
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 5);
    let mut pages = gateway.paginate("company/employees", &[]);

    let first = pages.next().await.unwrap().unwrap();
    assert_eq!(first.records.len(), 1);
    assert!(pages.next().await.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failure_mid_pagination_aborts_the_fetch() {
    let auth_calls = Arc::new(AtomicUsize::new(0));

    let router = Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let page: u64 = params
                    .get("page")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(1);
                if page == 1 {
                    Json(page_body(vec![json!({"id": 1})], 1, 3)).into_response()
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }),
        );
    let addr = spawn(router).await;

    let gateway = gateway_for(addr, 2);
    let mut pages = gateway.paginate("company/employees", &[]);

    assert!(pages.next().await.unwrap().is_ok());
    assert!(pages.next().await.unwrap().is_err());
    // The stream terminates after surfacing the failure
    assert!(pages.next().await.is_none());
}
