//! Department summary derivation
//!
//! Buckets exported rows by exact department string (case-sensitive, trimmed
//! of surrounding whitespace) and computes head count plus average base
//! salary per bucket. Recomputed from the full row set every run; never
//! updated incrementally.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::info;

use crate::{DepartmentStat, EmployeeRow};

/// Bucket used for rows with a blank or missing department.
pub const UNKNOWN_DEPARTMENT: &str = "Unknown";

#[derive(Default)]
struct Bucket {
    employee_count: u64,
    salaried_count: u64,
    salary_total: Decimal,
}

/// Compute per-department statistics over the full in-memory row set.
///
/// Buckets appear in first-seen row order, which makes repeated runs over the
/// same rows yield identical sequences. The average covers only rows with a
/// parseable, non-blank base salary; a bucket with no salaried rows reports
/// `None` rather than zero.
pub fn summarize(rows: &[EmployeeRow]) -> Vec<DepartmentStat> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Bucket> = HashMap::new();

    for row in rows {
        let trimmed = row.department.trim();
        let key = if trimmed.is_empty() {
            UNKNOWN_DEPARTMENT.to_string()
        } else {
            trimmed.to_string()
        };

        let bucket = buckets.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Bucket::default()
        });

        bucket.employee_count += 1;

        let salary = row.base_salary.trim();
        if !salary.is_empty() {
            if let Ok(amount) = Decimal::from_str(salary) {
                bucket.salary_total += amount;
                bucket.salaried_count += 1;
            }
        }
    }

    let stats: Vec<DepartmentStat> = order
        .into_iter()
        .map(|department| {
            let bucket = &buckets[&department];
            let average_base_salary = (bucket.salaried_count > 0).then(|| {
                (bucket.salary_total / Decimal::from(bucket.salaried_count))
                    .round_dp(2)
                    .normalize()
            });
            DepartmentStat {
                department,
                employee_count: bucket.employee_count,
                average_base_salary,
            }
        })
        .collect();

    info!(departments = stats.len(), "derived department summary");
    stats
}
