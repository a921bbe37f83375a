//! Flattening of raw nested records into the fixed export schema
//!
//! Pure functions, no I/O. The Personio master-data payload wraps every
//! attribute in a `{key: {"value": ...}}` envelope, with nested objects for
//! relations like department and supervisor; the employment and compensation
//! sub-records are flat. Everything is mapped field-by-field onto
//! [`EmployeeRow`]: date-like values normalize to ISO (`YYYY-MM-DD`) or
//! blank, salary coerces to a decimal-formatted string or blank, and missing
//! optional fields render as empty strings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::{EmployeeRow, RawEmployeeRecord};

/// Transformation errors.
///
/// Only a structurally unparsable record is rejected; the caller logs it as
/// a skipped-record warning and continues.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Record carries no employee id and cannot be joined or exported
    #[error("record has no employee id")]
    MissingEmployeeId,
}

/// Flatten one raw record into the 17-field export row.
///
/// Never fails on missing optional fields; a record whose employment or
/// compensation sub-part is absent simply renders those columns blank.
///
/// # Errors
/// Returns [`TransformError::MissingEmployeeId`] for a record with a blank
/// employee id.
pub fn flatten(record: &RawEmployeeRecord) -> Result<EmployeeRow, TransformError> {
    if record.employee_id.trim().is_empty() {
        return Err(TransformError::MissingEmployeeId);
    }

    let master = &record.master;
    let employment = record.employment.as_ref();
    let compensation = record.compensation.as_ref();

    let employment_field = |key: &str| employment.map(|e| sub_field(e, key)).unwrap_or_default();

    Ok(EmployeeRow {
        employee_id: record.employee_id.clone(),
        first_name: master_field(master, "first_name"),
        last_name: master_field(master, "last_name"),
        email: master_field(master, "email"),
        status: master_field(master, "status"),
        hire_date: format_date(&employment_field("hire_date")),
        termination_date: format_date(&employment_field("termination_date")),
        position: employment_field("position"),
        department: master_field(master, "department"),
        team: master_field(master, "team"),
        supervisor_name: supervisor_name(master),
        location: master_field(master, "office"),
        weekly_working_hours: employment_field("weekly_working_hours"),
        employment_type: employment_field("employment_type"),
        cost_center: {
            let primary = employment_field("cost_centers");
            if primary.is_empty() {
                employment_field("cost_center")
            } else {
                primary
            }
        },
        base_salary: compensation
            .map(|c| format_salary(sub_value(c, "fixed_salary")))
            .unwrap_or_default(),
        last_modified: format_date(&master_field(master, "last_modified_at")),
    })
}

/// Read an attribute from the master-data envelope.
///
/// Attributes usually come as `{key: {"value": ...}}`; some payloads inline
/// the value directly under the key.
fn master_field(master: &Value, key: &str) -> String {
    let Some(attr) = master.pointer(&format!("/attributes/{key}")) else {
        return String::new();
    };
    match attr.get("value") {
        Some(value) => scalar_string(value),
        None => scalar_string(attr),
    }
}

/// Read a field from a flat sub-record, tolerating an attribute envelope.
fn sub_field(record: &Value, key: &str) -> String {
    sub_value(record, key).map(scalar_string).unwrap_or_default()
}

fn sub_value<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record
        .pointer(&format!("/attributes/{key}/value"))
        .or_else(|| record.get(key))
}

/// Render a JSON value as a cell string.
///
/// Nested relation objects expose `label`/`name` (or an `attributes.name`),
/// lists join their rendered elements, and null renders blank.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => nested_label(value),
    }
}

fn nested_label(value: &Value) -> String {
    for key in ["label", "name"] {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            return s.to_string();
        }
    }
    if let Some(s) = value.pointer("/attributes/name").and_then(Value::as_str) {
        return s.to_string();
    }
    String::new()
}

/// Full name of the supervisor relation, blank when unset.
fn supervisor_name(master: &Value) -> String {
    let Some(value) = master.pointer("/attributes/supervisor/value") else {
        return String::new();
    };
    // The relation nests a second attribute envelope in newer payloads.
    let person = value.get("attributes").unwrap_or(value);

    let part = |key: &str| {
        person
            .get(key)
            .map(|v| match v.get("value") {
                Some(inner) => scalar_string(inner),
                None => scalar_string(v),
            })
            .unwrap_or_default()
    };

    let first = part("first_name");
    let last = part("last_name");
    format!("{first} {last}").trim().to_string()
}

/// Normalize a date-like value to `YYYY-MM-DD`, or blank when absent or
/// unparsable.
fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    let head = raw.split('T').next().unwrap_or(raw);
    if chrono::NaiveDate::parse_from_str(head, "%Y-%m-%d").is_ok() {
        return head.to_string();
    }
    String::new()
}

/// Coerce a numeric salary to a decimal-formatted string, blank when absent
/// or unparsable. Values round to two decimal places with trailing zeros
/// trimmed.
fn format_salary(value: Option<&Value>) -> String {
    let parsed = match value {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
        Some(Value::String(s)) if !s.trim().is_empty() => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    parsed
        .map(|d| d.round_dp(2).normalize().to_string())
        .unwrap_or_default()
}
