//! Structured progress events.
//!
//! The orchestration core never logs progress directly; it emits
//! [`PipelineEvent`]s into an injected [`EventSink`]. The default sink
//! forwards them to `tracing`.

use std::cell::{Cell, RefCell};

use sluice_types::ProjectName;

use crate::config::types::Stage;

/// What happened to one source file during static acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Parsed and moved to the success archive.
    Parsed { records: usize },
    /// Failed and moved to the error archive.
    Quarantined { error: String },
}

/// Why a project run was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ProjectInactive,
    AcquireInactive,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ProjectInactive => "project flagged as inactive",
            Self::AcquireInactive => "acquire section flagged as inactive",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    ProjectStarted {
        project: ProjectName,
    },
    ProjectSkipped {
        project: ProjectName,
        reason: SkipReason,
    },
    StageStarted {
        project: ProjectName,
        stage: Stage,
    },
    /// A stage had nothing to do (no records, or no section).
    StageSkipped {
        project: ProjectName,
        stage: Stage,
    },
    SubmoduleSkipped {
        project: ProjectName,
        stage: Stage,
        submodule: String,
    },
    SubmoduleFinished {
        project: ProjectName,
        stage: Stage,
        submodule: String,
        records: usize,
        state_kept: bool,
    },
    File {
        project: ProjectName,
        parser: String,
        file: String,
        outcome: FileOutcome,
    },
    ProjectFinished {
        project: ProjectName,
        records_acquired: usize,
        records_exported: usize,
    },
    ProjectFailed {
        project: ProjectName,
        error: String,
    },
}

/// Receiver for pipeline progress events.
pub trait EventSink {
    fn emit(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::ProjectStarted { project } => {
                tracing::info!(project = project.as_str(), "Running project");
            }
            PipelineEvent::ProjectSkipped { project, reason } => {
                tracing::info!(project = project.as_str(), %reason, "Skipping project");
            }
            PipelineEvent::StageStarted { project, stage } => {
                tracing::debug!(project = project.as_str(), %stage, "Stage started");
            }
            PipelineEvent::StageSkipped { project, stage } => {
                tracing::info!(project = project.as_str(), %stage, "Nothing to do for stage");
            }
            PipelineEvent::SubmoduleSkipped {
                project,
                stage,
                submodule,
            } => {
                tracing::info!(
                    project = project.as_str(),
                    %stage,
                    submodule,
                    "Skipping sub-module (flagged as inactive)"
                );
            }
            PipelineEvent::SubmoduleFinished {
                project,
                stage,
                submodule,
                records,
                state_kept,
            } => {
                tracing::info!(
                    project = project.as_str(),
                    %stage,
                    submodule,
                    records,
                    state_kept,
                    "Sub-module finished"
                );
            }
            PipelineEvent::File {
                project,
                parser,
                file,
                outcome: FileOutcome::Parsed { records },
            } => {
                tracing::info!(project = project.as_str(), parser, file, records, "Parsed file");
            }
            PipelineEvent::File {
                project,
                parser,
                file,
                outcome: FileOutcome::Quarantined { error },
            } => {
                tracing::warn!(
                    project = project.as_str(),
                    parser,
                    file,
                    error,
                    "Quarantined file"
                );
            }
            PipelineEvent::ProjectFinished {
                project,
                records_acquired,
                records_exported,
            } => {
                tracing::info!(
                    project = project.as_str(),
                    records_acquired,
                    records_exported,
                    "Finished project"
                );
            }
            PipelineEvent::ProjectFailed { project, error } => {
                tracing::error!(project = project.as_str(), error, "Project failed");
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RefCell<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the collected events.
    pub fn take(&self) -> Vec<PipelineEvent> {
        self.events.take()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Decorator that tallies file outcomes for run statistics.
pub(crate) struct CountingSink<'a> {
    inner: &'a dyn EventSink,
    parsed: Cell<u64>,
    quarantined: Cell<u64>,
}

impl<'a> CountingSink<'a> {
    pub(crate) fn new(inner: &'a dyn EventSink) -> Self {
        Self {
            inner,
            parsed: Cell::new(0),
            quarantined: Cell::new(0),
        }
    }

    pub(crate) fn files_parsed(&self) -> u64 {
        self.parsed.get()
    }

    pub(crate) fn files_quarantined(&self) -> u64 {
        self.quarantined.get()
    }
}

impl EventSink for CountingSink<'_> {
    fn emit(&self, event: &PipelineEvent) {
        if let PipelineEvent::File { outcome, .. } = event {
            let counter = match outcome {
                FileOutcome::Parsed { .. } => &self.parsed,
                FileOutcome::Quarantined { .. } => &self.quarantined,
            };
            counter.set(counter.get() + 1);
        }
        self.inner.emit(event);
    }
}
