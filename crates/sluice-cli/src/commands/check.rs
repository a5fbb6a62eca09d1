use anyhow::{Context, Result};
use sluice_engine::config::validator;
use sluice_engine::registry::module_path;
use sluice_engine::{is_active, PluginRegistry, ProjectCatalog, Stage};
use sluice_types::ProjectName;

use super::Paths;

/// Execute the `check` command: validate one project's config and list what would run.
pub fn execute(paths: &Paths, project: &str) -> Result<()> {
    let catalog = paths.catalog();
    let name = ProjectName::new(project);
    let config = catalog
        .load_config(&name)
        .with_context(|| format!("Failed to load project: {project}"))?;

    let registry = PluginRegistry::with_builtins();
    validator::validate_project(&config, &registry)?;
    tracing::info!(
        project,
        stages = Stage::ALL.iter().filter(|s| config.section(**s).is_some()).count(),
        "Project validated"
    );
    println!("Project structure: OK");

    if !is_active(config.root()) {
        println!("Project '{project}' is inactive; nothing would run.");
        return Ok(());
    }
    for stage in Stage::ALL {
        let Some(section) = config.section(stage) else {
            continue;
        };
        let state = if is_active(section) { "active" } else { "inactive" };
        println!("{stage}: {state}");
        for (kind, node) in config.submodules(stage) {
            let flag = if is_active(node) { "on " } else { "off" };
            println!("  [{flag}] {kind:12} {}", module_path(stage, kind));
        }
    }

    println!("\nAll checks passed.");
    Ok(())
}
