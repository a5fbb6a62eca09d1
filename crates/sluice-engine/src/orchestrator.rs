//! Pipeline orchestrator: runs projects through acquire, reshape and export.

use std::time::Instant;

use sluice_state::StateBackend;
use sluice_types::state::{RunStats, RunStatus};
use sluice_types::{ProjectName, ProjectState};

use crate::activation::{is_active, is_active_opt};
use crate::config::catalog::ProjectCatalog;
use crate::config::types::{ProjectConfig, Stage};
use crate::config::validator::check_config;
use crate::error::PipelineError;
use crate::events::{CountingSink, EventSink, PipelineEvent, SkipReason};
use crate::journal;
use crate::plugin::{AcquireWindow, StageContext};
use crate::registry::PluginRegistry;
use crate::result::{BatchReport, ProjectFailure, ProjectOutcome, ProjectSummary};
use crate::stage::{run_acquire, run_export, run_reshape};

/// Which projects a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSelection {
    All,
    Named(Vec<ProjectName>),
}

impl ProjectSelection {
    /// `all` selects every project; anything else names one project.
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg == "all" {
            Self::All
        } else {
            Self::Named(vec![ProjectName::new(arg)])
        }
    }
}

/// How a batch reacts to a failing project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Stop at the first failure and return it.
    #[default]
    FailFast,
    /// Journal the failure and move on to the next project.
    Wrapped,
}

/// Runs projects against a catalog, state backend and plugin registry.
pub struct Orchestrator<'a> {
    catalog: &'a dyn ProjectCatalog,
    backend: &'a dyn StateBackend,
    registry: &'a PluginRegistry,
    events: &'a dyn EventSink,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a dyn ProjectCatalog,
        backend: &'a dyn StateBackend,
        registry: &'a PluginRegistry,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            catalog,
            backend,
            registry,
            events,
        }
    }

    fn skip(&self, project: &ProjectName, reason: SkipReason) -> ProjectOutcome {
        self.events.emit(&PipelineEvent::ProjectSkipped {
            project: project.clone(),
            reason,
        });
        ProjectOutcome::Skipped(reason)
    }

    /// Run one project.
    ///
    /// An inactive project, or one whose acquire section is inactive, is
    /// skipped without touching its state. State is saved only when every
    /// stage succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, resolution, plugin or state error.
    pub fn run_project(
        &self,
        project: &ProjectName,
        window: AcquireWindow,
    ) -> Result<ProjectOutcome, PipelineError> {
        let start = Instant::now();
        let config = self.catalog.load_config(project)?;
        if !is_active(config.root()) {
            return Ok(self.skip(project, SkipReason::ProjectInactive));
        }
        check_config(&config)?;
        if !is_active_opt(config.section(Stage::Acquire)) {
            return Ok(self.skip(project, SkipReason::AcquireInactive));
        }

        self.events.emit(&PipelineEvent::ProjectStarted {
            project: project.clone(),
        });
        let mut state = self.backend.load_state(project)?;
        let run_id = self.backend.start_run(project)?;

        let counting = CountingSink::new(self.events);
        let ctx = StageContext {
            project,
            window,
            registry: self.registry,
            backend: self.backend,
            events: &counting,
        };

        let result = run_stages(&ctx, &config, &mut state).and_then(|counts| {
            self.backend.save_state(project, &state)?;
            Ok(counts)
        });

        let mut stats = RunStats {
            files_parsed: counting.files_parsed(),
            files_quarantined: counting.files_quarantined(),
            ..RunStats::default()
        };

        match result {
            Ok((acquired, exported)) => {
                stats.records_acquired = acquired as u64;
                stats.records_exported = exported as u64;
                self.backend
                    .complete_run(run_id, RunStatus::Completed, &stats)?;
                self.events.emit(&PipelineEvent::ProjectFinished {
                    project: project.clone(),
                    records_acquired: acquired,
                    records_exported: exported,
                });
                Ok(ProjectOutcome::Completed(ProjectSummary {
                    records_acquired: acquired,
                    records_exported: exported,
                    files_parsed: stats.files_parsed,
                    files_quarantined: stats.files_quarantined,
                    duration: start.elapsed(),
                }))
            }
            Err(err) => {
                stats.error_message = Some(err.to_string());
                if let Err(e) = self.backend.complete_run(run_id, RunStatus::Failed, &stats) {
                    tracing::error!(
                        project = project.as_str(),
                        run_id,
                        error = %e,
                        "Failed to close run record"
                    );
                }
                Err(err)
            }
        }
    }

    /// Run a selection of projects in catalog order.
    ///
    /// Named projects are all checked against the catalog before any runs.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownProject`] for a name the catalog does
    /// not know, and in [`BatchMode::FailFast`] the first project failure.
    pub fn run_batch(
        &self,
        selection: &ProjectSelection,
        window: AcquireWindow,
        mode: BatchMode,
    ) -> Result<BatchReport, PipelineError> {
        let known = self.catalog.list_projects()?;
        let targets = match selection {
            ProjectSelection::All => known,
            ProjectSelection::Named(names) => {
                if let Some(missing) = names.iter().find(|n| !known.contains(n)) {
                    return Err(PipelineError::UnknownProject(missing.to_string()));
                }
                names.clone()
            }
        };
        tracing::info!(projects = targets.len(), ?mode, "Running projects");

        let mut report = BatchReport::default();
        for project in targets {
            match self.run_project(&project, window) {
                Ok(outcome) => report.push(project, outcome),
                Err(err) => {
                    let message = err.to_string();
                    self.events.emit(&PipelineEvent::ProjectFailed {
                        project: project.clone(),
                        error: message.clone(),
                    });
                    match mode {
                        BatchMode::FailFast => return Err(err),
                        BatchMode::Wrapped => {
                            journal::record_failure(self.backend, &project, &message, None);
                            report.failed.push(ProjectFailure { project, message });
                        }
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Acquire, reshape, export. Returns (records acquired, records exported).
fn run_stages(
    ctx: &StageContext<'_>,
    config: &ProjectConfig,
    state: &mut ProjectState,
) -> Result<(usize, usize), PipelineError> {
    let acquired = run_acquire(ctx, config, state)?;
    let acquired_count = acquired.len();
    let records = run_reshape(ctx, config, state, acquired)?;
    run_export(ctx, config, state, &records)?;
    Ok((acquired_count, records.len()))
}
