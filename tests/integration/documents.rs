//! Document fetcher behavior against a local mock API

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use personio_export::documents::DocumentFetcher;
use personio_export::DocumentRef;

use crate::support::api::{auth_handler, gateway_for, spawn};

fn doc_ref(employee_id: &str, document_id: &str, filename: &str) -> DocumentRef {
    DocumentRef {
        employee_id: employee_id.to_string(),
        document_id: document_id.to_string(),
        filename: filename.to_string(),
        download_endpoint: format!(
            "company/employees/{employee_id}/documents/{document_id}/download"
        ),
    }
}

fn download_router() -> Router {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    Router::new()
        .route("/v1/auth", auth_handler(auth_calls))
        .route(
            "/v1/company/employees/:employee_id/documents/:document_id/download",
            get(
                |Path((employee_id, document_id)): Path<(String, String)>| async move {
                    if document_id == "404" {
                        StatusCode::NOT_FOUND.into_response()
                    } else {
                        format!("payload-{employee_id}-{document_id}").into_response()
                    }
                },
            ),
        )
}

#[tokio::test]
async fn test_downloads_into_per_employee_directories() {
    let addr = spawn(download_router()).await;
    let output = tempfile::tempdir().unwrap();

    let refs = vec![
        doc_ref("1001", "1", "contract.pdf"),
        doc_ref("1001", "2", "payslip.pdf"),
        doc_ref("1002", "3", "contract.pdf"),
    ];

    let fetcher = DocumentFetcher::new(gateway_for(addr, 3), 2);
    let report = fetcher.fetch_documents(&refs, output.path(), true).await;

    assert_eq!(report.succeeded, 3);
    assert!(report.is_clean());
    assert_eq!(
        std::fs::read_to_string(output.path().join("documents/1001/contract.pdf")).unwrap(),
        "payload-1001-1"
    );
    assert_eq!(
        std::fs::read_to_string(output.path().join("documents/1002/contract.pdf")).unwrap(),
        "payload-1002-3"
    );
}

#[tokio::test]
async fn test_single_failure_is_reported_not_fatal() {
    let addr = spawn(download_router()).await;
    let output = tempfile::tempdir().unwrap();

    let refs = vec![
        doc_ref("1001", "1", "contract.pdf"),
        doc_ref("1001", "404", "missing.pdf"),
    ];

    let fetcher = DocumentFetcher::new(gateway_for(addr, 3), 2);
    let report = fetcher.fetch_documents(&refs, output.path(), true).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.document_id, "404");
    assert!(output.path().join("documents/1001/contract.pdf").exists());
    assert!(!output.path().join("documents/1001/missing.pdf").exists());
}

#[tokio::test]
async fn test_disabled_fetch_is_a_noop() {
    let addr = spawn(download_router()).await;
    let output = tempfile::tempdir().unwrap();

    let refs = vec![doc_ref("1001", "1", "contract.pdf")];
    let fetcher = DocumentFetcher::new(gateway_for(addr, 3), 2);
    let report = fetcher.fetch_documents(&refs, output.path(), false).await;

    assert_eq!(report.succeeded, 0);
    assert!(report.is_clean());
    assert!(!output.path().join("documents").exists());
}

#[tokio::test]
async fn test_redownload_overwrites_existing_file() {
    let addr = spawn(download_router()).await;
    let output = tempfile::tempdir().unwrap();

    let dir = output.path().join("documents/1001");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("contract.pdf"), "stale").unwrap();

    let refs = vec![doc_ref("1001", "1", "contract.pdf")];
    let fetcher = DocumentFetcher::new(gateway_for(addr, 3), 1);
    let report = fetcher.fetch_documents(&refs, output.path(), true).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(
        std::fs::read_to_string(dir.join("contract.pdf")).unwrap(),
        "payload-1001-1"
    );
}
