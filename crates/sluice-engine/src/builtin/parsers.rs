//! File parsers for static acquisition.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;
use sluice_types::{ProjectName, Record, StateBlob, Value};

use crate::acquire::static_files::ParserSpec;
use crate::plugin::Parser;

/// Parser state after one more file: a running file count and the last name.
fn bump_files(state: &StateBlob, path: &Path) -> StateBlob {
    let parsed = state
        .get("files_parsed")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    let last = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    StateBlob::new(json!({"files_parsed": parsed + 1, "last_file": last}))
}

/// Headered CSV. Cells are typed with [`Value::infer`].
///
/// Options: `delimiter` (single character, default `,`).
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvParser;

fn delimiter(spec: &ParserSpec) -> Result<u8> {
    let Some(raw) = spec.get("delimiter") else {
        return Ok(b',');
    };
    match raw.as_str().map(str::as_bytes) {
        Some([byte]) => Ok(*byte),
        _ => bail!("`delimiter` must be a single ASCII character, got: {raw}"),
    }
}

impl Parser for CsvParser {
    fn parse(
        &self,
        _project: &ProjectName,
        spec: &ParserSpec,
        state: StateBlob,
        path: &Path,
    ) -> Result<(StateBlob, Vec<Record>)> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter(spec)?)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let headers = reader.headers().context("Failed to read CSV header")?.clone();

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.with_context(|| format!("Bad CSV row {}", line + 1))?;
            // Left unchecked so duplicate headers fail record validation.
            records.push(Record::from_fields(
                headers
                    .iter()
                    .zip(row.iter())
                    .map(|(name, cell)| (name.to_string(), Value::infer(cell)))
                    .collect(),
            ));
        }

        Ok((bump_files(&state, path), records))
    }
}

/// One JSON object per line; blank lines are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesParser;

impl Parser for JsonLinesParser {
    fn parse(
        &self,
        _project: &ProjectName,
        _spec: &ParserSpec,
        state: StateBlob,
        path: &Path,
    ) -> Result<(StateBlob, Vec<Record>)> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<Record>(line)
                    .with_context(|| format!("Bad JSON record on line {}", n + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((bump_files(&state, path), records))
    }
}
