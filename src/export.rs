//! Single-run export orchestration
//!
//! `run_export` is the core's entry point, invoked synchronously by the CLI
//! or the scheduler: authenticate, extract, transform, write both CSV
//! artifacts, then (independently) fetch documents. Fatal errors abort with
//! no partial CSV output; document failures are collected into the summary
//! and never fail the run.

use std::sync::Arc;

use tracing::{info, warn};

use crate::aggregate::summarize;
use crate::api::{build_http_client, ApiError, HttpGateway, TokenProvider};
use crate::config::AppConfig;
use crate::documents::{DocumentFetcher, FetchReport};
use crate::output::{write_department_summary, write_employee_export, OutputError};
use crate::transform::flatten;

/// Fatal run errors, surfaced to the CLI boundary.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Authentication or API failure (extraction aborted, no CSV written)
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Output path unwritable or CSV serialization failure
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct ExportSummary {
    /// Employee rows written to the export CSV
    pub employees: usize,
    /// Raw records skipped as structurally unparsable
    pub skipped_records: usize,
    /// Department buckets in the summary CSV
    pub departments: usize,
    /// Document download outcome (empty when downloads are disabled)
    pub documents: FetchReport,
}

/// Execute one full export run.
///
/// # Errors
/// Returns [`ExportError`] for authentication failures, API failures after
/// retries, and output failures. Document-fetch failures are reported in the
/// summary instead.
pub async fn run_export(config: &AppConfig) -> Result<ExportSummary, ExportError> {
    info!("starting Personio export run");

    let client = build_http_client(config.http.timeout())?;
    let tokens = Arc::new(TokenProvider::new(
        client.clone(),
        &config.personio.base_url,
        config.personio.client_id.clone(),
        config.personio.client_secret.clone(),
    ));
    let gateway = HttpGateway::new(
        client,
        config.personio.base_url.clone(),
        tokens,
        config.http.retry_max_attempts,
    );

    let extractor = crate::extract::Extractor::new(gateway.clone());
    let (records, doc_refs) = extractor.extract_all().await?;

    let mut rows = Vec::with_capacity(records.len());
    let mut skipped_records = 0;
    for record in &records {
        match flatten(record) {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped_records += 1;
                warn!(employee_id = %record.employee_id, "skipping unparsable record: {e}");
            }
        }
    }
    info!(
        rows = rows.len(),
        skipped = skipped_records,
        "transformed employee records"
    );

    let output_dir = &config.export.output_path;
    write_employee_export(output_dir, &rows)?;

    let stats = summarize(&rows);
    write_department_summary(output_dir, &stats)?;

    let fetcher = DocumentFetcher::new(gateway, config.export.document_concurrency);
    let documents = fetcher
        .fetch_documents(&doc_refs, output_dir, config.export.include_documents)
        .await;
    if !documents.is_clean() {
        warn!(
            failed = documents.failed.len(),
            "run completed with document failures"
        );
    }

    info!(
        employees = rows.len(),
        departments = stats.len(),
        "export run completed"
    );

    Ok(ExportSummary {
        employees: rows.len(),
        skipped_records,
        departments: stats.len(),
        documents,
    })
}
