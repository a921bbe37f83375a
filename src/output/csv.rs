//! CSV writers for the employee export and the department summary

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{OutputError, OutputResult};
use crate::{DepartmentStat, EmployeeRow};

/// Filename of the employee export artifact.
pub const EMPLOYEE_EXPORT_FILENAME: &str = "personio_employee_export.csv";

/// Filename of the department summary artifact.
pub const DEPARTMENT_SUMMARY_FILENAME: &str = "department_summary.csv";

/// Write the employee export CSV into `output_dir`.
///
/// # Returns
/// The final path of the written file.
pub fn write_employee_export(output_dir: &Path, rows: &[EmployeeRow]) -> OutputResult<PathBuf> {
    let path = output_dir.join(EMPLOYEE_EXPORT_FILENAME);
    write_csv_atomic(&path, &EmployeeRow::HEADERS, rows)?;
    info!(rows = rows.len(), path = %path.display(), "employee export written");
    Ok(path)
}

/// Write the department summary CSV into `output_dir`.
///
/// # Returns
/// The final path of the written file.
pub fn write_department_summary(
    output_dir: &Path,
    stats: &[DepartmentStat],
) -> OutputResult<PathBuf> {
    let path = output_dir.join(DEPARTMENT_SUMMARY_FILENAME);
    write_csv_atomic(&path, &DepartmentStat::HEADERS, stats)?;
    info!(departments = stats.len(), path = %path.display(), "department summary written");
    Ok(path)
}

/// Serialize records into a temp file next to `path`, then rename into place.
///
/// The header row is always written, even for an empty record set, so the
/// artifact's schema stays visible run over run.
fn write_csv_atomic<T: Serialize>(path: &Path, headers: &[&str], records: &[T]) -> OutputResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| OutputError::Io(format!("output path {} has no parent", path.display())))?;

    std::fs::create_dir_all(dir)
        .map_err(|e| OutputError::Io(format!("failed to create output directory: {e}")))?;

    let temp = NamedTempFile::new_in(dir)
        .map_err(|e| OutputError::Io(format!("failed to create temp file: {e}")))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(temp);

    writer
        .write_record(headers)
        .map_err(|e| OutputError::Csv(format!("failed to write header row: {e}")))?;

    for record in records {
        writer
            .serialize(record)
            .map_err(|e| OutputError::Csv(format!("failed to write row: {e}")))?;
    }

    let temp = writer
        .into_inner()
        .map_err(|e| OutputError::Io(format!("failed to flush CSV writer: {e}")))?;

    temp.persist(path)
        .map_err(|e| OutputError::Io(format!("failed to move output into place: {e}")))?;

    debug!(path = %path.display(), "atomic CSV write finalized");
    Ok(())
}
