//! Health-check endpoint for scheduled deployments
//!
//! A minimal HTTP surface kept outside the export core: `GET /health`
//! reports service status, uptime, and the outcome of the most recent run.
//! Served only in `schedule` mode.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

use crate::export::ExportSummary;
use crate::shutdown::SharedShutdown;

/// Outcome of the most recent export run.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Whether the run succeeded
    pub success: bool,
    /// Employees exported (successful runs)
    pub employees: Option<usize>,
    /// Documents that failed to download (successful runs)
    pub failed_documents: Option<usize>,
    /// Error text (failed runs)
    pub error: Option<String>,
}

/// Shared run-state handle published by the scheduler and read by the
/// health endpoint.
#[derive(Clone)]
pub struct ServiceState {
    started_at: Instant,
    last_run: Arc<RwLock<Option<LastRun>>>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceState {
    /// Create a fresh state with no completed runs.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            last_run: Arc::new(RwLock::new(None)),
        }
    }

    /// Record a successful run.
    pub async fn record_success(&self, summary: &ExportSummary) {
        let mut guard = self.last_run.write().await;
        *guard = Some(LastRun {
            finished_at: Utc::now(),
            success: true,
            employees: Some(summary.employees),
            failed_documents: Some(summary.documents.failed.len()),
            error: None,
        });
    }

    /// Record a failed run.
    pub async fn record_failure(&self, error: String) {
        let mut guard = self.last_run.write().await;
        *guard = Some(LastRun {
            finished_at: Utc::now(),
            success: false,
            employees: None,
            failed_documents: None,
            error: Some(error),
        });
    }

    async fn snapshot(&self) -> Option<LastRun> {
        self.last_run.read().await.clone()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    last_run: Option<LastRun>,
}

/// Build the health router.
pub fn create_router(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn index_handler() -> &'static str {
    "Personio export service is running."
}

async fn health_handler(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "up",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        last_run: state.snapshot().await,
    })
}

/// Serve the health endpoint until shutdown is requested.
///
/// # Errors
/// Returns the bind or serve error as a string for the CLI boundary.
pub async fn serve(
    state: ServiceState,
    port: u16,
    shutdown: SharedShutdown,
) -> Result<(), String> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind health endpoint on {addr}: {e}"))?;

    info!(%addr, "health endpoint listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { shutdown.wait_for_shutdown().await })
        .await
        .map_err(|e| format!("health endpoint failed: {e}"))
}
