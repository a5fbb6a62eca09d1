//! CSV rendering of record sets.

use std::path::Path;

use anyhow::{Context, Result};
use sluice_types::Record;

/// Union of field names across `records`, in first-seen order.
#[must_use]
pub fn header(records: &[Record]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in records.iter().flat_map(Record::field_names) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Write `records` to `path` as CSV with a [`header`] row.
///
/// Fields a record lacks are written blank. An empty record set produces an
/// empty file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let columns = header(records);
    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for record in records {
        writer.write_record(columns.iter().map(|name| {
            record
                .get(name)
                .map(ToString::to_string)
                .unwrap_or_default()
        }))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
