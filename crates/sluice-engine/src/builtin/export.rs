//! File exporters.
//!
//! Both take a `path` option; `{project}` in it is replaced with the
//! project name. Parent directories are created as needed.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value as Json};
use sluice_types::{ProjectName, Record, StateBlob};

use crate::plugin::Exporter;
use crate::tabular::write_csv;

fn target_path(project: &ProjectName, config: &Json) -> Result<PathBuf> {
    let raw = config
        .get("path")
        .and_then(Json::as_str)
        .filter(|p| !p.is_empty())
        .context("exporter requires a non-empty `path`")?;
    let path = PathBuf::from(raw.replace("{project}", project.as_str()));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(path)
}

/// Exporter state: total rows written so far and when the last export ran.
fn export_state(state: &StateBlob, rows: usize) -> StateBlob {
    let total = state
        .get("rows_exported")
        .and_then(Json::as_u64)
        .unwrap_or(0);
    StateBlob::new(json!({
        "rows_exported": total + rows as u64,
        "last_export": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

/// Writes the record set to one CSV file, replacing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn export(
        &self,
        project: &ProjectName,
        config: &Json,
        state: StateBlob,
        records: &[Record],
    ) -> Result<StateBlob> {
        let path = target_path(project, config)?;
        write_csv(&path, records)?;
        tracing::info!(
            project = project.as_str(),
            path = %path.display(),
            rows = records.len(),
            "Exported CSV"
        );
        Ok(export_state(&state, records.len()))
    }
}

/// Writes one JSON object per record. `append: true` appends instead of
/// replacing the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesExporter;

impl Exporter for JsonLinesExporter {
    fn export(
        &self,
        project: &ProjectName,
        config: &Json,
        state: StateBlob,
        records: &[Record],
    ) -> Result<StateBlob> {
        let path = target_path(project, config)?;
        let append = config.get("append").and_then(Json::as_bool).unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut out = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(
            project = project.as_str(),
            path = %path.display(),
            rows = records.len(),
            append,
            "Exported JSON lines"
        );
        Ok(export_state(&state, records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("site", "north"),
            Record::new().with("id", 2),
        ]
    }

    #[test]
    fn csv_export_substitutes_project_and_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("out/{project}.csv");
        let config = json!({"path": template.to_str().unwrap()});
        let project = ProjectName::new("weather");

        let state = CsvExporter
            .export(&project, &config, StateBlob::Empty, &records())
            .unwrap();
        let state = CsvExporter.export(&project, &config, state, &records()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("out/weather.csv")).unwrap();
        assert_eq!(text, "id,site\n1,north\n2,\n");
        assert_eq!(state.get("rows_exported"), Some(&json!(4)));
        assert!(state.get("last_export").is_some());
    }

    #[test]
    fn jsonl_export_appends_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let config = json!({"path": path.to_str().unwrap(), "append": true});
        let project = ProjectName::new("p");

        JsonLinesExporter
            .export(&project, &config, StateBlob::Empty, &records())
            .unwrap();
        JsonLinesExporter
            .export(&project, &config, StateBlob::Empty, &records()[..1])
            .unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "{\"id\":1,\"site\":\"north\"}\n{\"id\":2}\n{\"id\":1,\"site\":\"north\"}\n"
        );
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = JsonLinesExporter
            .export(&ProjectName::new("p"), &json!({}), StateBlob::Empty, &records())
            .unwrap_err();
        assert!(err.to_string().contains("path"));
    }
}
