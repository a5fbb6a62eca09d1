//! Project catalogs: where project configs come from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;
use sluice_types::ProjectName;

use crate::config::parser::{parse_project, parse_project_str};
use crate::config::types::ProjectConfig;
use crate::error::PipelineError;

/// File names a project directory may hold its config under, in lookup order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["config.yaml", "config.yml"];

/// Source of project names and configs.
pub trait ProjectCatalog {
    /// All known projects, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn list_projects(&self) -> Result<Vec<ProjectName>, PipelineError>;

    /// Load one project's config.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownProject`] if the project has no
    /// config, and an infrastructure error if it cannot be parsed.
    fn load_config(&self, project: &ProjectName) -> Result<ProjectConfig, PipelineError>;
}

/// Projects laid out as `{root}/{project}/config.yaml`.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Config file of `project`, if one exists.
    #[must_use]
    pub fn config_path(&self, project: &str) -> Option<PathBuf> {
        if project.is_empty() || project.contains(['/', '\\']) || project == ".." {
            return None;
        }
        let dir = self.root.join(project);
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

impl ProjectCatalog for DirectoryCatalog {
    fn list_projects(&self) -> Result<Vec<ProjectName>, PipelineError> {
        let entries = std::fs::read_dir(&self.root).with_context(|| {
            format!("Failed to read projects directory: {}", self.root.display())
        })?;

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read projects directory entry")?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if entry.path().is_dir() && self.config_path(&name).is_some() {
                projects.push(ProjectName::new(name));
            }
        }
        projects.sort();
        Ok(projects)
    }

    fn load_config(&self, project: &ProjectName) -> Result<ProjectConfig, PipelineError> {
        let path = self
            .config_path(project.as_str())
            .ok_or_else(|| PipelineError::UnknownProject(project.to_string()))?;
        tracing::debug!(project = project.as_str(), path = %path.display(), "Loading config");
        Ok(parse_project(project.clone(), &path)?)
    }
}

/// Configs held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    projects: BTreeMap<ProjectName, Value>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, project: impl Into<ProjectName>, root: Value) -> &mut Self {
        self.projects.insert(project.into(), root);
        self
    }

    /// Parse and insert a YAML config.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn insert_yaml(
        &mut self,
        project: impl Into<ProjectName>,
        yaml: &str,
    ) -> anyhow::Result<&mut Self> {
        let config = parse_project_str(project, yaml)?;
        let (name, root) = (config.name().clone(), config.root().clone());
        self.projects.insert(name, root);
        Ok(self)
    }
}

impl ProjectCatalog for InMemoryCatalog {
    fn list_projects(&self) -> Result<Vec<ProjectName>, PipelineError> {
        Ok(self.projects.keys().cloned().collect())
    }

    fn load_config(&self, project: &ProjectName) -> Result<ProjectConfig, PipelineError> {
        self.projects
            .get(project)
            .map(|root| ProjectConfig::new(project.clone(), root.clone()))
            .ok_or_else(|| PipelineError::UnknownProject(project.to_string()))
    }
}
