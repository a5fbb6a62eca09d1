use anyhow::Result;
use sluice_state::StateBackend;
use sluice_types::ProjectName;

use super::Paths;

/// Execute the `failures` command: print the newest journal notes for a project.
pub fn execute(paths: &Paths, project: &str, limit: usize) -> Result<()> {
    let backend = paths.backend()?;
    let notes = backend.failures(&ProjectName::new(project), limit)?;

    if notes.is_empty() {
        println!("No failures recorded for '{project}'.");
        return Ok(());
    }
    for note in &notes {
        println!("{}  {}", note.recorded_at, note.message);
        if let Some(context) = &note.context {
            println!("    at {context}");
        }
    }
    Ok(())
}
