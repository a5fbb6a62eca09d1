//! Pipeline error model.

use std::path::PathBuf;

use sluice_state::StateError;
use sluice_types::RecordError;

/// Categorized pipeline error.
///
/// Filesystem, resolution, and configuration errors are raised at their
/// origin and abort the current project. `Plugin` wraps opaque errors raised
/// by plugin code; the static acquirer converts those into quarantine moves
/// instead of propagating them.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A directory files are read from or moved out of does not exist.
    #[error("source directory does not exist: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// Strict move into a directory that does not exist.
    #[error("destination directory does not exist: {}", path.display())]
    DestMissing { path: PathBuf },

    /// No plugin registered under the attempted module path.
    #[error("no plugin at: {module}")]
    PluginNotFound { module: String },

    /// A plugin emitted a malformed record.
    #[error("record {index} is not a well-formed record: {source}")]
    InvalidRecordType {
        index: usize,
        #[source]
        source: RecordError,
    },

    /// A required top-level config section is absent.
    #[error("no {section} section defined for {project}")]
    MissingSection { project: String, section: String },

    /// Config is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A requested project has no config in the catalog.
    #[error("could not find project matching: {0}")]
    UnknownProject(String),

    /// Error raised by plugin code.
    #[error("{module} failed: {source:#}")]
    Plugin {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    /// Filesystem failure outside of plugin code.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// State backend failure.
    #[error(transparent)]
    State(#[from] StateError),

    /// Catalog, config parsing, and other host-side failures.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl PipelineError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn plugin(module: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Plugin {
            module: module.into(),
            source,
        }
    }

    /// `true` for errors caused by configuration rather than data or I/O.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::PluginNotFound { .. }
                | Self::MissingSection { .. }
                | Self::InvalidConfig(_)
                | Self::UnknownProject(_)
        )
    }
}
