//! State backend trait definition.
//!
//! [`StateBackend`] defines the storage contract for project state blobs,
//! the failure journal, and run history. Model types live in
//! [`sluice_types::state`] and [`sluice_types::journal`].

use sluice_types::journal::FailureNote;
use sluice_types::state::{ProjectName, ProjectState, RunStats, RunStatus};

use crate::error;

/// Storage contract for project state.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn StateBackend>`.
pub trait StateBackend: Send + Sync {
    /// Load the persisted state for a project.
    ///
    /// Returns an empty state when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn load_state(&self, project: &ProjectName) -> error::Result<ProjectState>;

    /// Replace the persisted state for a project.
    ///
    /// Keys absent from `state` are removed from storage.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn save_state(&self, project: &ProjectName, state: &ProjectState) -> error::Result<()>;

    /// Append a note to the failure journal.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn record_failure(&self, note: &FailureNote) -> error::Result<()>;

    /// Most recent failure notes for a project, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn failures(&self, project: &ProjectName, limit: usize) -> error::Result<Vec<FailureNote>>;

    /// Begin a new project run, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, project: &ProjectName) -> error::Result<i64>;

    /// Finalize a project run with status and aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the trait is object-safe (can be used as `dyn StateBackend`).
    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn StateBackend) {}
    }
}
