//! Employee document downloads
//!
//! Downloads binary document payloads into `output_root/documents/` with one
//! directory per employee, independent of the CSV path but sharing the same
//! gateway (and therefore the same cached credential). A single document
//! failure is recorded and logged, never fatal: the run still succeeds and
//! the CSV artifacts are unaffected.

use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::api::HttpGateway;
use crate::DocumentRef;

/// Outcome of a document-fetch pass.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Documents written successfully
    pub succeeded: u64,
    /// Documents that failed, with the reason
    pub failed: Vec<(DocumentRef, String)>,
}

impl FetchReport {
    /// Whether every requested document was written.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Downloads document payloads with bounded concurrency.
///
/// Each [`DocumentRef`] is independent and write targets never collide
/// (distinct employee directories), so downloads run through a bounded
/// worker pool sharing the single gateway.
pub struct DocumentFetcher {
    gateway: HttpGateway,
    concurrency: usize,
}

impl DocumentFetcher {
    /// Create a fetcher with the given worker bound (minimum 1).
    pub fn new(gateway: HttpGateway, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency: concurrency.max(1),
        }
    }

    /// Download every referenced document under `output_root/documents/`.
    ///
    /// No-op when `enabled` is false. Re-downloading overwrites an existing
    /// file of the same name; there is no dedup or versioning.
    pub async fn fetch_documents(
        &self,
        doc_refs: &[DocumentRef],
        output_root: &Path,
        enabled: bool,
    ) -> FetchReport {
        if !enabled {
            debug!("document download disabled, skipping");
            return FetchReport::default();
        }
        if doc_refs.is_empty() {
            return FetchReport::default();
        }

        info!(
            documents = doc_refs.len(),
            concurrency = self.concurrency,
            "starting document downloads"
        );

        let results: Vec<(DocumentRef, Result<(), String>)> =
            stream::iter(doc_refs.iter().cloned())
                .map(|doc| {
                    let gateway = self.gateway.clone();
                    let root = output_root.to_path_buf();
                    async move {
                        let outcome = download_one(&gateway, &doc, &root).await;
                        (doc, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut report = FetchReport::default();
        for (doc, outcome) in results {
            match outcome {
                Ok(()) => report.succeeded += 1,
                Err(reason) => {
                    warn!(
                        employee_id = %doc.employee_id,
                        document_id = %doc.document_id,
                        "document download failed: {reason}"
                    );
                    report.failed.push((doc, reason));
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "document downloads finished"
        );
        report
    }
}

async fn download_one(
    gateway: &HttpGateway,
    doc: &DocumentRef,
    output_root: &Path,
) -> Result<(), String> {
    let dir = employee_directory(output_root, &doc.employee_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| format!("failed to create {}: {e}", dir.display()))?;

    let payload = gateway
        .download(&doc.download_endpoint)
        .await
        .map_err(|e| e.to_string())?;

    let path = dir.join(&doc.filename);
    tokio::fs::write(&path, &payload)
        .await
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;

    debug!(path = %path.display(), bytes = payload.len(), "document saved");
    Ok(())
}

/// Directory a given employee's documents land in.
pub fn employee_directory(output_root: &Path, employee_id: &str) -> PathBuf {
    output_root.join("documents").join(employee_id)
}

/// Strip filesystem-hostile characters from a document filename.
///
/// Keeps alphanumerics plus `._- ` and space, matching what the source
/// system allows in titles. Falls back to a document-id name when nothing
/// survives.
pub fn sanitize_filename(name: &str, document_id: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        format!("document_{document_id}")
    } else {
        cleaned
    }
}
