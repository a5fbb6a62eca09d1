//! Failure journal helper used by the static acquirer and the batch loop.

use sluice_state::{failure_note, StateBackend};
use sluice_types::ProjectName;

/// Append a failure note to the state backend.
///
/// Journal write failures are logged and otherwise ignored: the error being
/// recorded has already been handled, and losing its note must not turn it
/// into a second failure.
pub(crate) fn record_failure(
    backend: &dyn StateBackend,
    project: &ProjectName,
    message: &str,
    context: Option<String>,
) {
    let note = failure_note(project, message.to_string(), context);

    match backend.record_failure(&note) {
        Ok(()) => {
            tracing::debug!(
                project = project.as_str(),
                context = note.context.as_deref(),
                "Recorded failure note"
            );
        }
        Err(e) => {
            tracing::error!(
                project = project.as_str(),
                message,
                error = %e,
                "Failed to record failure note"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_state::SqliteStateBackend;

    #[test]
    fn records_note_with_context() {
        let backend = SqliteStateBackend::in_memory().unwrap();
        let project = ProjectName::new("weather");
        record_failure(&backend, &project, "bad header", Some("in/a.csv".into()));

        let notes = backend.failures(&project, 10).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "bad header");
        assert_eq!(notes[0].context.as_deref(), Some("in/a.csv"));
    }
}
