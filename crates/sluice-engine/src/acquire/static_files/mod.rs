//! Static file acquisition.
//!
//! Runs each configured parser over the matching files of its source
//! directory. A file whose parse, validation, snapshot or archive move fails
//! is journaled and moved to the error directory; the run continues with the
//! next file. Records and parser state from a file are kept only once the
//! file has reached its archive directory.

mod snapshot;
mod spec;

use std::path::Path;

use serde_json::Value;
use sluice_types::{ProjectState, Record, StateBlob};

pub use snapshot::{snapshot_name, write_snapshot};
pub use spec::{parser_specs, FileRoutes, ParserSpec};

use crate::activation::SETTINGS_KEY;
use crate::error::PipelineError;
use crate::events::{FileOutcome, PipelineEvent};
use crate::files::{list_candidate_files, move_file};
use crate::journal;
use crate::plugin::{Acquirer, Parser, StageContext};
use crate::registry::parser_path;

/// Registry kind of the static acquirer.
pub const KIND: &str = "static";

/// The `static` acquirer.
///
/// Its state blob nests one slice per parser name.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticAcquirer;

impl Acquirer for StaticAcquirer {
    fn acquire(
        &self,
        ctx: &StageContext<'_>,
        config: &Value,
        state: StateBlob,
    ) -> anyhow::Result<(StateBlob, Vec<Record>)> {
        let settings = config.get(SETTINGS_KEY).and_then(Value::as_object);
        let specs = parser_specs(config)?;

        let mut parser_state = ProjectState::from_blob(state);
        let mut records = Vec::new();

        for spec in &specs {
            let routes = FileRoutes::resolve(ctx.project, spec, settings)?;
            let parser = ctx.registry.get_parser(spec.parser())?;
            let files = list_candidate_files(&routes.source, &routes.suffix)?;
            tracing::info!(
                project = ctx.project.as_str(),
                parser = spec.parser(),
                source = %routes.source.display(),
                files = files.len(),
                "Running static file parser"
            );

            for file in &files {
                let slice = parser_state.slice(spec.parser());
                match ingest_file(ctx, parser.as_ref(), spec, &routes, slice, file) {
                    Ok((blob, parsed)) => {
                        ctx.emit(&PipelineEvent::File {
                            project: ctx.project.clone(),
                            parser: spec.parser().to_string(),
                            file: file.clone(),
                            outcome: FileOutcome::Parsed {
                                records: parsed.len(),
                            },
                        });
                        records.extend(parsed);
                        parser_state.apply(spec.parser(), blob);
                    }
                    Err(err) => quarantine(ctx, spec, &routes, file, &err)?,
                }
            }
        }

        Ok((parser_state.into_blob(), records))
    }
}

/// Parse, validate, snapshot and archive one file.
fn ingest_file(
    ctx: &StageContext<'_>,
    parser: &dyn Parser,
    spec: &ParserSpec,
    routes: &FileRoutes,
    slice: StateBlob,
    file: &str,
) -> Result<(StateBlob, Vec<Record>), PipelineError> {
    let path = routes.source.join(file);
    let (blob, records) = parser
        .parse(ctx.project, spec, slice, &path)
        .map_err(|e| PipelineError::plugin(parser_path(spec.parser()), e))?;

    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|source| PipelineError::InvalidRecordType { index, source })?;
    }

    if let Some(raw_dir) = &routes.on_raw {
        write_snapshot(raw_dir, file, &records)?;
    }
    move_file(&routes.source, &routes.on_fmt, file, false)?;
    Ok((blob, records))
}

/// Journal a file failure and move the file to the error directory.
///
/// Only a failed move is returned as an error.
fn quarantine(
    ctx: &StageContext<'_>,
    spec: &ParserSpec,
    routes: &FileRoutes,
    file: &str,
    err: &PipelineError,
) -> Result<(), PipelineError> {
    let message = err.to_string();
    let context = display_path(&routes.source.join(file));
    journal::record_failure(ctx.backend, ctx.project, &message, Some(context));

    move_file(&routes.source, &routes.on_err, file, false)?;
    ctx.emit(&PipelineEvent::File {
        project: ctx.project.clone(),
        parser: spec.parser().to_string(),
        file: file.to_string(),
        outcome: FileOutcome::Quarantined { error: message },
    });
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
