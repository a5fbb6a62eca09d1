//! Orchestration core for sluice: activation resolution, plugin registry,
//! static file acquisition, stage runners and the project orchestrator.

pub mod acquire;
pub mod activation;
pub mod builtin;
pub mod config;
pub mod error;
pub mod events;
pub mod files;
pub(crate) mod journal;
pub mod orchestrator;
pub mod plugin;
pub mod registry;
pub mod result;
pub mod stage;
pub mod tabular;

// Re-export public API for convenience
pub use acquire::static_files::{ParserSpec, StaticAcquirer};
pub use activation::is_active;
pub use config::catalog::{DirectoryCatalog, InMemoryCatalog, ProjectCatalog};
pub use config::types::{ProjectConfig, Stage};
pub use error::PipelineError;
pub use events::{EventSink, PipelineEvent, TracingEventSink};
pub use orchestrator::{BatchMode, Orchestrator, ProjectSelection};
pub use plugin::{AcquireWindow, Acquirer, Exporter, Parser, Reshaper, StageContext};
pub use registry::PluginRegistry;
pub use result::{BatchReport, ProjectOutcome, ProjectSummary};
