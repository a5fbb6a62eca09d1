use anyhow::Result;
use sluice_engine::{is_active, ProjectCatalog};

use super::Paths;

/// Execute the `projects` command: list every project in the catalog.
pub fn execute(paths: &Paths) -> Result<()> {
    let catalog = paths.catalog();
    let projects = catalog.list_projects()?;

    if projects.is_empty() {
        println!("No projects found under {}.", paths.root.display());
        return Ok(());
    }

    for project in &projects {
        match catalog.load_config(project) {
            Ok(config) => {
                let status = if is_active(config.root()) {
                    "active"
                } else {
                    "inactive"
                };
                println!("  {project:24} {status}");
            }
            Err(e) => println!("  {project:24} unreadable ({e})"),
        }
    }
    println!("\n{} project(s).", projects.len());
    Ok(())
}
