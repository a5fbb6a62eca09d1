//! Project and batch run result types.

use std::time::Duration;

use sluice_types::ProjectName;

use crate::events::SkipReason;

/// Aggregate counts for one completed project run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSummary {
    pub records_acquired: usize,
    pub records_exported: usize,
    pub files_parsed: u64,
    pub files_quarantined: u64,
    pub duration: Duration,
}

/// Result of [`Orchestrator::run_project`](crate::orchestrator::Orchestrator::run_project).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectOutcome {
    Skipped(SkipReason),
    Completed(ProjectSummary),
}

impl ProjectOutcome {
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    #[must_use]
    pub fn summary(&self) -> Option<&ProjectSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::Skipped(_) => None,
        }
    }
}

/// A project that failed inside a wrapped batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFailure {
    pub project: ProjectName,
    pub message: String,
}

/// Per-project results of a batch run, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: Vec<(ProjectName, ProjectSummary)>,
    pub skipped: Vec<(ProjectName, SkipReason)>,
    pub failed: Vec<ProjectFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of projects the batch attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed.len() + self.skipped.len() + self.failed.len()
    }

    pub(crate) fn push(&mut self, project: ProjectName, outcome: ProjectOutcome) {
        match outcome {
            ProjectOutcome::Completed(summary) => self.completed.push((project, summary)),
            ProjectOutcome::Skipped(reason) => self.skipped.push((project, reason)),
        }
    }
}
