//! Report persistence.
//!
//! Reports are serialized in full before anything touches the disk, written
//! next to the destination and renamed into place, so a reader never sees a
//! half-written report. Reading checks the schema major version.

use super::schema::Report;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info, warn};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Write a report as pretty JSON and return the number of bytes written
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::InvalidPath` - empty path, a directory, or a parent that
///   cannot be created
/// * `OutputError::SerializationFailed` - the report cannot be encoded
/// * `OutputError::WriteFailed` - I/O error while writing or renaming
///
/// # Example
/// ```ignore
/// let report = build_report(&model, &tree, "run.trace");
/// let bytes = write_report(&report, "report.json")?;
/// ```
pub fn write_report(report: &Report, output_path: impl AsRef<Path>) -> Result<u64, OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing report to: {}", output_path.display());

    let staging = staging_path(output_path)?;
    let encoded = report_to_string(report)?;

    fs::write(&staging, encoded.as_bytes())?;
    if let Err(err) = fs::rename(&staging, output_path) {
        // Leave no stray staging file behind
        let _ = fs::remove_file(&staging);
        return Err(OutputError::WriteFailed(err));
    }

    let bytes = encoded.len() as u64;
    info!(
        "Report written: {} owners, {} lines, {} bytes",
        report.owners.len(),
        report.line_count(),
        bytes
    );
    Ok(bytes)
}

/// Serialize a report to a pretty JSON string
pub fn report_to_string(report: &Report) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Sibling path the report is staged at before the rename
///
/// Creates missing parent directories.
fn staging_path(output_path: &Path) -> Result<PathBuf, OutputError> {
    let Some(file_name) = output_path.file_name() else {
        return Err(OutputError::InvalidPath(format!(
            "No file name in '{}'",
            output_path.display()
        )));
    };
    if output_path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            output_path.display()
        )));
    }
    if output_path.extension().map_or(true, |ext| ext != "json") {
        warn!("Report path {} has no .json extension", output_path.display());
    }

    let parent = output_path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if !parent.exists() {
            debug!("Creating report directory: {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!("Cannot create directory {}: {}", parent.display(), e))
            })?;
        }
    }

    let mut staged = file_name.to_os_string();
    staged.push(".partial");
    Ok(output_path.with_file_name(staged))
}

/// Read a report written by [`write_report`]
///
/// **Public** - used by the validate command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - the file cannot be opened
/// * `OutputError::SerializationFailed` - the content is not a report
/// * `OutputError::UnsupportedVersion` - the schema major version differs
pub fn read_report(input_path: impl AsRef<Path>) -> Result<Report, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading report from: {}", input_path.display());

    let file = fs::File::open(input_path)?;
    let report: Report = serde_json::from_reader(BufReader::new(file))?;

    if major_version(&report.version) != major_version(SCHEMA_VERSION) {
        return Err(OutputError::UnsupportedVersion {
            found: report.version,
            expected: SCHEMA_VERSION.to_string(),
        });
    }

    debug!(
        "Report loaded: version {}, source {}, {} lines",
        report.version,
        report.source,
        report.line_count()
    );
    Ok(report)
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
