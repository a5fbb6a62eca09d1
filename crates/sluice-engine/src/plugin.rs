//! Plugin contracts.
//!
//! Every pipeline sub-module implements one of four traits. Plugins report
//! failures as `anyhow::Error`; the stage runners attach the module path and
//! lift them into [`PipelineError::Plugin`](crate::error::PipelineError).

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sluice_state::StateBackend;
use sluice_types::{ProjectName, Record, StateBlob};

use crate::acquire::static_files::ParserSpec;
use crate::events::{EventSink, PipelineEvent};
use crate::registry::PluginRegistry;

/// Optional time bounds handed to acquisition plugins.
///
/// The engine does not interpret the window; plugins that fetch by time
/// range use it, others ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquireWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl AcquireWindow {
    #[must_use]
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }
}

/// Host services available to an acquirer.
pub struct StageContext<'a> {
    pub project: &'a ProjectName,
    pub window: AcquireWindow,
    pub registry: &'a PluginRegistry,
    pub backend: &'a dyn StateBackend,
    pub events: &'a dyn EventSink,
}

impl StageContext<'_> {
    pub fn emit(&self, event: &PipelineEvent) {
        self.events.emit(event);
    }
}

/// Pulls records into the pipeline.
pub trait Acquirer {
    /// # Errors
    ///
    /// Any error aborts the current project run.
    fn acquire(
        &self,
        ctx: &StageContext<'_>,
        config: &Value,
        state: StateBlob,
    ) -> anyhow::Result<(StateBlob, Vec<Record>)>;
}

/// Turns one file into records, for the static acquirer.
pub trait Parser {
    /// # Errors
    ///
    /// An error quarantines the file; it does not abort the run.
    fn parse(
        &self,
        project: &ProjectName,
        spec: &ParserSpec,
        state: StateBlob,
        path: &Path,
    ) -> anyhow::Result<(StateBlob, Vec<Record>)>;
}

/// Transforms the full record set.
pub trait Reshaper {
    /// Position in the reshape sequence; lower runs first.
    fn ord(&self) -> i32;

    /// # Errors
    ///
    /// Any error aborts the current project run.
    fn reshape(
        &self,
        project: &ProjectName,
        config: &Value,
        state: StateBlob,
        records: Vec<Record>,
    ) -> anyhow::Result<(StateBlob, Vec<Record>)>;
}

/// Writes the final record set somewhere.
pub trait Exporter {
    /// # Errors
    ///
    /// Any error aborts the current project run.
    fn export(
        &self,
        project: &ProjectName,
        config: &Value,
        state: StateBlob,
        records: &[Record],
    ) -> anyhow::Result<StateBlob>;
}
