//! Raw CSV snapshots of parsed files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sluice_types::Record;

use crate::tabular::write_csv;

/// Snapshot file name for a source file: `.csv` is appended unless present.
#[must_use]
pub fn snapshot_name(filename: &str) -> String {
    if filename.ends_with(".csv") {
        filename.to_string()
    } else {
        format!("{filename}.csv")
    }
}

/// Write `records` as CSV to `{dir}/{filename}[.csv]`, creating `dir`.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_snapshot(dir: &Path, filename: &str, records: &[Record]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create snapshot directory: {}", dir.display()))?;
    let path = dir.join(snapshot_name(filename));
    write_csv(&path, records).context("Failed to write raw snapshot")?;
    Ok(path)
}
