//! Plugin resolution by module path.
//!
//! Plugins are registered as factories under dotted module paths:
//! `sluice.{category}.{kind}` for stage sub-modules (case-normalized) and
//! `sluice.acquire.parsers.{name}` for static-acquisition parsers.

use std::collections::BTreeMap;

use crate::config::types::Stage;
use crate::error::PipelineError;
use crate::plugin::{Acquirer, Exporter, Parser, Reshaper};

/// Root namespace of every module path.
pub const NAMESPACE: &str = "sluice";

type AcquirerFactory = Box<dyn Fn() -> Box<dyn Acquirer> + Send + Sync>;
type ParserFactory = Box<dyn Fn() -> Box<dyn Parser> + Send + Sync>;
type ReshaperFactory = Box<dyn Fn() -> Box<dyn Reshaper> + Send + Sync>;
type ExporterFactory = Box<dyn Fn() -> Box<dyn Exporter> + Send + Sync>;

enum Factory {
    Acquirer(AcquirerFactory),
    Parser(ParserFactory),
    Reshaper(ReshaperFactory),
    Exporter(ExporterFactory),
}

/// A freshly instantiated stage sub-module.
pub enum Plugin {
    Acquirer(Box<dyn Acquirer>),
    Reshaper(Box<dyn Reshaper>),
    Exporter(Box<dyn Exporter>),
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Acquirer(_) => "Plugin::Acquirer",
            Self::Reshaper(_) => "Plugin::Reshaper",
            Self::Exporter(_) => "Plugin::Exporter",
        })
    }
}

/// Module path for a stage sub-module.
#[must_use]
pub fn module_path(stage: Stage, kind: &str) -> String {
    format!("{NAMESPACE}.{}.{kind}", stage.as_str()).to_lowercase()
}

/// Module path for a static-acquisition parser.
#[must_use]
pub fn parser_path(name: &str) -> String {
    format!("{NAMESPACE}.acquire.parsers.{name}")
}

/// Explicit name-to-factory registry.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, Factory>,
}

impl PluginRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the static acquirer and every built-in plugin.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::acquire::register(&mut registry);
        crate::builtin::register(&mut registry);
        registry
    }

    pub fn register_acquirer<F>(&mut self, kind: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Acquirer> + Send + Sync + 'static,
    {
        self.factories.insert(
            module_path(Stage::Acquire, kind),
            Factory::Acquirer(Box::new(factory)),
        );
        self
    }

    pub fn register_parser<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Parser> + Send + Sync + 'static,
    {
        self.factories
            .insert(parser_path(name), Factory::Parser(Box::new(factory)));
        self
    }

    pub fn register_reshaper<F>(&mut self, kind: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Reshaper> + Send + Sync + 'static,
    {
        self.factories.insert(
            module_path(Stage::Reshape, kind),
            Factory::Reshaper(Box::new(factory)),
        );
        self
    }

    pub fn register_exporter<F>(&mut self, kind: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Exporter> + Send + Sync + 'static,
    {
        self.factories.insert(
            module_path(Stage::Export, kind),
            Factory::Exporter(Box::new(factory)),
        );
        self
    }

    /// Instantiate the sub-module `kind` of a stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PluginNotFound`] with the attempted path when
    /// nothing of the right category is registered there.
    pub fn get_util(&self, stage: Stage, kind: &str) -> Result<Plugin, PipelineError> {
        let module = module_path(stage, kind);
        match (stage, self.factories.get(&module)) {
            (Stage::Acquire, Some(Factory::Acquirer(f))) => Ok(Plugin::Acquirer(f())),
            (Stage::Reshape, Some(Factory::Reshaper(f))) => Ok(Plugin::Reshaper(f())),
            (Stage::Export, Some(Factory::Exporter(f))) => Ok(Plugin::Exporter(f())),
            _ => Err(PipelineError::PluginNotFound { module }),
        }
    }

    /// Instantiate a static-acquisition parser.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PluginNotFound`] if no parser is registered
    /// under `name`.
    pub fn get_parser(&self, name: &str) -> Result<Box<dyn Parser>, PipelineError> {
        let module = parser_path(name);
        match self.factories.get(&module) {
            Some(Factory::Parser(f)) => Ok(f()),
            _ => Err(PipelineError::PluginNotFound { module }),
        }
    }

    /// # Errors
    ///
    /// See [`PluginRegistry::get_util`].
    pub fn acquirer(&self, kind: &str) -> Result<Box<dyn Acquirer>, PipelineError> {
        match self.get_util(Stage::Acquire, kind)? {
            Plugin::Acquirer(p) => Ok(p),
            _ => Err(PipelineError::PluginNotFound {
                module: module_path(Stage::Acquire, kind),
            }),
        }
    }

    /// # Errors
    ///
    /// See [`PluginRegistry::get_util`].
    pub fn reshaper(&self, kind: &str) -> Result<Box<dyn Reshaper>, PipelineError> {
        match self.get_util(Stage::Reshape, kind)? {
            Plugin::Reshaper(p) => Ok(p),
            _ => Err(PipelineError::PluginNotFound {
                module: module_path(Stage::Reshape, kind),
            }),
        }
    }

    /// # Errors
    ///
    /// See [`PluginRegistry::get_util`].
    pub fn exporter(&self, kind: &str) -> Result<Box<dyn Exporter>, PipelineError> {
        match self.get_util(Stage::Export, kind)? {
            Plugin::Exporter(p) => Ok(p),
            _ => Err(PipelineError::PluginNotFound {
                module: module_path(Stage::Export, kind),
            }),
        }
    }

    /// `true` if something is registered at `module`.
    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.factories.contains_key(module)
    }

    /// Every registered module path, sorted.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("modules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use sluice_types::{ProjectName, Record, StateBlob};

    struct Noop;

    impl Exporter for Noop {
        fn export(
            &self,
            _project: &ProjectName,
            _config: &Value,
            state: StateBlob,
            _records: &[Record],
        ) -> anyhow::Result<StateBlob> {
            Ok(state)
        }
    }

    #[test]
    fn module_paths_are_case_normalized() {
        assert_eq!(module_path(Stage::Export, "JsonL"), "sluice.export.jsonl");
        assert_eq!(parser_path("csv"), "sluice.acquire.parsers.csv");
    }

    #[test]
    fn lookup_is_case_insensitive_for_stage_modules() {
        let mut registry = PluginRegistry::new();
        registry.register_exporter("Noop", || Box::new(Noop));
        assert!(registry.exporter("NOOP").is_ok());
        assert!(registry.contains("sluice.export.noop"));
    }

    #[test]
    fn unknown_kind_reports_attempted_path() {
        let registry = PluginRegistry::new();
        match registry.get_util(Stage::Reshape, "Nope") {
            Err(PipelineError::PluginNotFound { module }) => {
                assert_eq!(module, "sluice.reshape.nope");
            }
            other => panic!("expected PluginNotFound, got {other:?}"),
        }
    }

    #[test]
    fn category_mismatch_is_not_found() {
        let mut registry = PluginRegistry::new();
        registry.register_exporter("noop", || Box::new(Noop));
        assert!(matches!(
            registry.get_util(Stage::Acquire, "noop"),
            Err(PipelineError::PluginNotFound { .. })
        ));
    }

    #[test]
    fn unknown_parser_reports_attempted_path() {
        let registry = PluginRegistry::new();
        let Err(err) = registry.get_parser("xml") else {
            panic!("expected an error");
        };
        assert_eq!(err.to_string(), "no plugin at: sluice.acquire.parsers.xml");
    }

    #[test]
    fn builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        let modules: Vec<&str> = registry.modules().collect();
        for expected in [
            "sluice.acquire.static",
            "sluice.acquire.parsers.csv",
            "sluice.acquire.parsers.jsonl",
            "sluice.reshape.rename",
            "sluice.reshape.dedupe",
            "sluice.export.csv",
            "sluice.export.jsonl",
        ] {
            assert!(modules.contains(&expected), "missing {expected}");
        }
    }
}
