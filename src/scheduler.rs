//! Interval scheduling of export runs
//!
//! Re-runs the export on a fixed interval until shutdown is requested. A
//! failed run is logged and published to the health state but does not stop
//! the loop: each scheduled invocation starts a fresh extraction from zero,
//! so the next tick gets a clean retry.

use std::time::Duration;

use tracing::{error, info};

use crate::config::AppConfig;
use crate::export::run_export;
use crate::health::ServiceState;
use crate::shutdown::SharedShutdown;

/// Run the export now and then on every interval tick until shutdown.
pub async fn run_scheduled(config: &AppConfig, state: ServiceState, shutdown: SharedShutdown) {
    let interval = Duration::from_secs(config.schedule.interval_minutes * 60);
    info!(
        interval_minutes = config.schedule.interval_minutes,
        "scheduler started"
    );

    loop {
        match run_export(config).await {
            Ok(summary) => {
                info!(
                    employees = summary.employees,
                    departments = summary.departments,
                    failed_documents = summary.documents.failed.len(),
                    "scheduled run succeeded"
                );
                state.record_success(&summary).await;
            }
            Err(e) => {
                error!("scheduled run failed: {e}");
                state.record_failure(e.to_string()).await;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.wait_for_shutdown() => {
                info!("shutdown requested, stopping scheduler");
                break;
            }
        }
    }
}
