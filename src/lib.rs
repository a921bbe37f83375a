//! # Personio Export Library
//!
//! A library for exporting HR master data, employment and compensation
//! records, and employee documents from the Personio API into stable CSV
//! artifacts and a per-employee document tree.
//!
//! ## Features
//!
//! - **Token Lifecycle**: OAuth-style credential exchange with cached tokens
//!   and expiry safety margin
//! - **Robust Fetching**: Bounded retry with exponential backoff and jitter,
//!   `Retry-After` compliance, and transparent pagination
//! - **Stable Schema**: Heterogeneous nested records flattened into a fixed
//!   17-column employee export
//! - **Department Summary**: Per-department head count and average base salary
//! - **Document Archiving**: Optional bounded-concurrency document downloads
//!
//! ## Quick Start
//!
//! ```no_run
//! use personio_export::config::load_config;
//! use personio_export::export::run_export;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("config.yml".as_ref())?;
//! let summary = run_export(&config).await?;
//! println!("exported {} employees", summary.employees);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`api`] - Token provider, HTTP gateway, and pagination
//! - [`extract`] - Assembly of raw per-employee records from the API
//! - [`transform`] - Flattening into the fixed employee-row schema
//! - [`aggregate`] - Department summary derivation
//! - [`output`] - Atomic CSV artifact writers
//! - [`documents`] - Per-employee document downloads
//! - [`export`] - Single-run orchestration (`run_export`)
//! - [`scheduler`] - Interval re-runs with graceful shutdown
//! - [`health`] - Minimal health-check endpoint for scheduled deployments

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Department summary derivation
pub mod aggregate;

/// Personio API access layer
pub mod api;

/// CLI command implementations
pub mod cli;

/// Configuration loading and validation
pub mod config;

/// Employee document downloads
pub mod documents;

/// Single-run export orchestration
pub mod export;

/// Raw record extraction from the API
pub mod extract;

/// Health-check endpoint for scheduled deployments
pub mod health;

/// CSV artifact writers
pub mod output;

/// Interval scheduling of export runs
pub mod scheduler;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Flattening of raw records into the export schema
pub mod transform;

/// Raw per-employee record assembled from the master data, employment, and
/// compensation resources.
///
/// The employee id is the join key across all three sources. Master data is
/// authoritative: a record always carries it, while the employment and
/// compensation sub-records are optional and absence is an expected state,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEmployeeRecord {
    /// Employee id as reported by the master-data resource
    pub employee_id: String,
    /// Raw master-data payload (Personio `attributes` envelope)
    pub master: Value,
    /// Raw employment-detail payload, if the employee has one
    pub employment: Option<Value>,
    /// Raw compensation payload, if the employee has one
    pub compensation: Option<Value>,
}

/// Reference to a single downloadable employee document.
///
/// Produced by the extractor's document-metadata phase and consumed by the
/// document fetcher; the CSV pipeline never sees these.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRef {
    /// Owning employee id (names the target directory)
    pub employee_id: String,
    /// Document id as reported by the API
    pub document_id: String,
    /// Sanitized filename the payload is stored under
    pub filename: String,
    /// API endpoint the binary payload is downloaded from
    pub download_endpoint: String,
}

/// One flattened, formatted row of the employee export.
///
/// Field order and header names are the published schema and must not change
/// between runs. Dates are ISO (`YYYY-MM-DD`) or blank; missing values render
/// as the empty string, never as a placeholder word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRow {
    /// Employee id (join key; always present)
    #[serde(rename = "employeeID")]
    pub employee_id: String,
    /// First name
    #[serde(rename = "First name")]
    pub first_name: String,
    /// Last name
    #[serde(rename = "Last name")]
    pub last_name: String,
    /// Work email address
    #[serde(rename = "email")]
    pub email: String,
    /// Employment status (active, onboarding, ...)
    #[serde(rename = "status")]
    pub status: String,
    /// Hire date, ISO or blank
    #[serde(rename = "Hire date")]
    pub hire_date: String,
    /// Termination date, ISO or blank
    #[serde(rename = "Termination date")]
    pub termination_date: String,
    /// Position title
    #[serde(rename = "position")]
    pub position: String,
    /// Department name
    #[serde(rename = "department")]
    pub department: String,
    /// Team name
    #[serde(rename = "team")]
    pub team: String,
    /// Supervisor's full name
    #[serde(rename = "Supervisor name")]
    pub supervisor_name: String,
    /// Office location
    #[serde(rename = "location")]
    pub location: String,
    /// Contracted weekly working hours
    #[serde(rename = "Weekly working hours")]
    pub weekly_working_hours: String,
    /// Employment type (internal, external, ...)
    #[serde(rename = "Employment type")]
    pub employment_type: String,
    /// Cost center assignment
    #[serde(rename = "Cost center")]
    pub cost_center: String,
    /// Base salary as a decimal-formatted string, blank when absent
    #[serde(rename = "Base Salary")]
    pub base_salary: String,
    /// Last modification timestamp from the source system
    #[serde(rename = "Last modified")]
    pub last_modified: String,
}

impl EmployeeRow {
    /// Published header names, in schema order.
    pub const HEADERS: [&'static str; 17] = [
        "employeeID",
        "First name",
        "Last name",
        "email",
        "status",
        "Hire date",
        "Termination date",
        "position",
        "department",
        "team",
        "Supervisor name",
        "location",
        "Weekly working hours",
        "Employment type",
        "Cost center",
        "Base Salary",
        "Last modified",
    ];
}

/// Per-department summary statistics, recomputed from scratch every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentStat {
    /// Department bucket name (`Unknown` for blank departments)
    pub department: String,
    /// Number of employees in the bucket
    pub employee_count: u64,
    /// Average base salary over rows with a parseable salary; `None` (blank
    /// in CSV) when the bucket has no salaried rows
    pub average_base_salary: Option<Decimal>,
}

impl DepartmentStat {
    /// Summary CSV header names, in schema order.
    pub const HEADERS: [&'static str; 3] = ["department", "employee_count", "average_base_salary"];
}
