//! Project configuration model.
//!
//! A project config is kept as loosely-typed JSON: sub-module configs are
//! owned by plugins and passed through untouched, so only the stage layout
//! is given structure here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_types::ProjectName;

use crate::activation::{IS_ACTIVE_KEY, SETTINGS_KEY};

/// One of the three fixed pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Acquire,
    Reshape,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Acquire, Stage::Reshape, Stage::Export];

    /// Config key and registry category of this stage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Reshape => "reshape",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed configuration for one project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    name: ProjectName,
    root: Value,
}

impl ProjectConfig {
    #[must_use]
    pub fn new(name: impl Into<ProjectName>, root: Value) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    #[must_use]
    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// The whole config tree.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Top-level section for a stage, if present.
    #[must_use]
    pub fn section(&self, stage: Stage) -> Option<&Value> {
        self.root.get(stage.as_str())
    }

    /// Sub-modules configured for a stage, in config order.
    ///
    /// A section that is not a mapping has no sub-modules. The section's own
    /// `is-active` and `settings` keys are activation flags, not sub-modules.
    pub fn submodules(&self, stage: Stage) -> impl Iterator<Item = (&str, &Value)> {
        self.section(stage)
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
            .filter(|(k, _)| *k != IS_ACTIVE_KEY && *k != SETTINGS_KEY)
    }
}
