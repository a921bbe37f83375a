//! Raw record extraction
//!
//! Drives the gateway across the four logical resources (employees,
//! employment details, compensation, document metadata) and joins them by
//! employee id. Master data is the authoritative employee universe: records
//! found only in the secondary resources are dropped, while an employee
//! missing a secondary record keeps blank sub-parts.
//!
//! A single resource fetch that exhausts retries fails the whole extraction;
//! there is no skip-this-resource mode because the downstream schema assumes
//! all sources were attempted.

use std::collections::HashMap;

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiResult, HttpGateway};
use crate::documents::sanitize_filename;
use crate::{DocumentRef, RawEmployeeRecord};

const EMPLOYEES_ENDPOINT: &str = "company/employees";
const EMPLOYMENT_ENDPOINT: &str = "company/employment-details";
const COMPENSATION_ENDPOINT: &str = "company/compensations";
const DOCUMENTS_ENDPOINT: &str = "company/documents";

/// Assembles raw per-employee records and document references.
pub struct Extractor {
    gateway: HttpGateway,
}

impl Extractor {
    /// Create an extractor over the shared gateway.
    pub fn new(gateway: HttpGateway) -> Self {
        Self { gateway }
    }

    /// Pull all four resources and join them into complete raw records.
    ///
    /// Records come back in master-data order. Document references are only
    /// produced for employees present in master data.
    ///
    /// # Errors
    /// Propagates the first [`crate::api::ApiError`] from any resource; a
    /// failed fetch aborts the whole extraction and the caller discards any
    /// partially fetched data.
    pub async fn extract_all(&self) -> ApiResult<(Vec<RawEmployeeRecord>, Vec<DocumentRef>)> {
        info!("starting extraction of employee master data");
        let masters = self.collect(EMPLOYEES_ENDPOINT).await?;

        let mut order: Vec<String> = Vec::new();
        let mut records: HashMap<String, RawEmployeeRecord> = HashMap::new();

        for master in masters {
            let Some(employee_id) = master_employee_id(&master) else {
                warn!("skipping employee master record without an id");
                continue;
            };
            if records.contains_key(&employee_id) {
                warn!(employee_id = %employee_id, "duplicate employee id in master data, keeping first");
                continue;
            }
            order.push(employee_id.clone());
            records.insert(
                employee_id.clone(),
                RawEmployeeRecord {
                    employee_id,
                    master,
                    employment: None,
                    compensation: None,
                },
            );
        }
        info!(employees = order.len(), "fetched employee master data");

        for detail in self.collect(EMPLOYMENT_ENDPOINT).await? {
            match sub_record_employee_id(&detail) {
                Some(id) => match records.get_mut(&id) {
                    Some(record) => record.employment = Some(detail),
                    None => {
                        debug!(employee_id = %id, "employment detail without master record, dropped")
                    }
                },
                None => debug!("employment detail without an employee id, dropped"),
            }
        }

        for compensation in self.collect(COMPENSATION_ENDPOINT).await? {
            match sub_record_employee_id(&compensation) {
                Some(id) => match records.get_mut(&id) {
                    Some(record) => record.compensation = Some(compensation),
                    None => {
                        debug!(employee_id = %id, "compensation without master record, dropped")
                    }
                },
                None => debug!("compensation record without an employee id, dropped"),
            }
        }

        let mut doc_refs = Vec::new();
        for metadata in self.collect(DOCUMENTS_ENDPOINT).await? {
            let Some(employee_id) = sub_record_employee_id(&metadata) else {
                debug!("document metadata without an employee id, dropped");
                continue;
            };
            if !records.contains_key(&employee_id) {
                debug!(employee_id = %employee_id, "document metadata without master record, dropped");
                continue;
            }
            if let Some(doc_ref) = document_ref(&employee_id, &metadata) {
                doc_refs.push(doc_ref);
            }
        }
        info!(documents = doc_refs.len(), "collected document metadata");

        let ordered = order
            .into_iter()
            .filter_map(|id| records.remove(&id))
            .collect();

        Ok((ordered, doc_refs))
    }

    /// Drain a paginated endpoint into a record list, preserving server
    /// order.
    async fn collect(&self, endpoint: &str) -> ApiResult<Vec<Value>> {
        let mut pages = self.gateway.paginate(endpoint, &[]);
        let mut out = Vec::new();
        while let Some(page) = pages.next().await {
            out.extend(page?.records);
        }
        Ok(out)
    }
}

/// Employee id from a master-data record (`attributes.id.value`).
fn master_employee_id(master: &Value) -> Option<String> {
    id_string(master.pointer("/attributes/id/value")?)
}

/// Employee id from a flat secondary record (`employee_id`), tolerating an
/// attribute envelope.
fn sub_record_employee_id(record: &Value) -> Option<String> {
    let value = record
        .pointer("/attributes/employee_id/value")
        .or_else(|| record.get("employee_id"))?;
    id_string(value)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Build the downloadable reference for one document-metadata record.
fn document_ref(employee_id: &str, metadata: &Value) -> Option<DocumentRef> {
    let document_id = id_string(metadata.get("id")?)?;

    let title = metadata
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();
    let extension = metadata
        .get("extension")
        .and_then(Value::as_str)
        .map(|e| e.trim_matches('.'))
        .unwrap_or("");

    let raw_name = if extension.is_empty() {
        title
    } else {
        format!("{title}.{extension}")
    };
    let filename = sanitize_filename(&raw_name, &document_id);

    Some(DocumentRef {
        employee_id: employee_id.to_string(),
        document_id: document_id.clone(),
        filename,
        download_endpoint: format!(
            "company/employees/{employee_id}/documents/{document_id}/download"
        ),
    })
}
