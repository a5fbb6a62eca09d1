//! Structural and semantic validation for project configuration.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::acquire::static_files::{self, parser_specs, FileRoutes};
use crate::activation::{is_active, SETTINGS_KEY};
use crate::config::types::{ProjectConfig, Stage};
use crate::error::PipelineError;
use crate::registry::{module_path, parser_path, PluginRegistry};

/// Sections every runnable project must define.
pub const REQUIRED_SECTIONS: [Stage; 2] = [Stage::Acquire, Stage::Export];

/// Check that the required top-level sections exist.
///
/// # Errors
///
/// Returns [`PipelineError::MissingSection`] naming the first absent
/// section.
pub fn check_config(config: &ProjectConfig) -> Result<(), PipelineError> {
    for stage in REQUIRED_SECTIONS {
        if config.section(stage).is_none() {
            return Err(PipelineError::MissingSection {
                project: config.name().to_string(),
                section: stage.as_str().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_static(
    node: &Value,
    registry: &PluginRegistry,
    config: &ProjectConfig,
    errors: &mut Vec<String>,
) {
    let specs = match parser_specs(node) {
        Ok(specs) => specs,
        Err(e) => {
            errors.push(format!("acquire.static: {e}"));
            return;
        }
    };
    let settings = node.get(SETTINGS_KEY).and_then(Value::as_object);
    for (i, spec) in specs.iter().enumerate() {
        let module = parser_path(spec.parser());
        if !registry.contains(&module) {
            errors.push(format!("acquire.static.parser[{i}]: no plugin at: {module}"));
        }
        if let Err(e) = FileRoutes::resolve(config.name(), spec, settings) {
            errors.push(format!("acquire.static.parser[{i}]: {e}"));
        }
    }
}

/// Validate a project config against a plugin registry.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// Inactive sub-modules are not checked; they are never resolved at run
/// time either.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the config.
pub fn validate_project(config: &ProjectConfig, registry: &PluginRegistry) -> Result<()> {
    let mut errors = Vec::new();

    if !config.root().is_object() && !config.root().is_null() {
        bail!(
            "Project validation failed:\n  - config root must be a mapping, got: {}",
            config.root()
        );
    }

    for stage in REQUIRED_SECTIONS {
        if config.section(stage).is_none() {
            errors.push(format!("Missing required section '{stage}'"));
        }
    }

    for stage in Stage::ALL {
        let Some(section) = config.section(stage) else {
            continue;
        };
        if !section.is_object() {
            errors.push(format!("Section '{stage}' must be a mapping of sub-modules"));
            continue;
        }
        for (kind, node) in config.submodules(stage) {
            if !is_active(node) {
                continue;
            }
            if !node.is_object() && node != &Value::Bool(true) {
                errors.push(format!(
                    "{stage}.{kind}: sub-module config must be a mapping or `true`"
                ));
                continue;
            }
            let module = module_path(stage, kind);
            if !registry.contains(&module) {
                errors.push(format!("{stage}.{kind}: no plugin at: {module}"));
            }
            if stage == Stage::Acquire && kind.eq_ignore_ascii_case(static_files::KIND) {
                validate_static(node, registry, config, &mut errors);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Project validation failed:\n  - {}", errors.join("\n  - "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_project_str;

    fn valid_yaml() -> &'static str {
        r"
acquire:
  static:
    settings:
      source: tmp/inputs/weather/
    parser:
      - parser: csv
        suffix: '*.csv'
reshape:
  rename:
    fields:
      temp: temperature
  dedupe: true
export:
  jsonl:
    path: out/weather.jsonl
"
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::with_builtins()
    }

    #[test]
    fn test_valid_project_passes() {
        let config = parse_project_str("weather", valid_yaml()).unwrap();
        assert!(check_config(&config).is_ok());
        assert!(validate_project(&config, &registry()).is_ok());
    }

    #[test]
    fn test_missing_export_is_named() {
        let yaml = valid_yaml().replace("export:", "exports:");
        let config = parse_project_str("weather", &yaml).unwrap();
        let err = check_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "no export section defined for weather");
        let err = validate_project(&config, &registry()).unwrap_err().to_string();
        assert!(err.contains("Missing required section 'export'"));
    }

    #[test]
    fn test_missing_acquire_checked_first() {
        let config = parse_project_str("p", "reshape: {}\n").unwrap();
        match check_config(&config) {
            Err(PipelineError::MissingSection { section, .. }) => assert_eq!(section, "acquire"),
            other => panic!("expected MissingSection, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_plugins_all_reported() {
        let yaml = valid_yaml()
            .replace("jsonl:", "parquet:")
            .replace("parser: csv", "parser: xml");
        let config = parse_project_str("weather", &yaml).unwrap();
        let err = validate_project(&config, &registry()).unwrap_err().to_string();
        assert!(err.contains("no plugin at: sluice.export.parquet"));
        assert!(err.contains("no plugin at: sluice.acquire.parsers.xml"));
    }

    #[test]
    fn test_inactive_submodules_not_resolved() {
        let yaml = valid_yaml().replace("  dedupe: true", "  mystery: false");
        let config = parse_project_str("weather", &yaml).unwrap();
        assert!(validate_project(&config, &registry()).is_ok());
    }

    #[test]
    fn test_bad_static_routes_reported() {
        let yaml = valid_yaml().replace("suffix: '*.csv'", "on-raw: true");
        let config = parse_project_str("weather", &yaml).unwrap();
        let err = validate_project(&config, &registry()).unwrap_err().to_string();
        assert!(err.contains("acquire.static.parser[0]"));
        assert!(err.contains("on-raw"));
    }

    #[test]
    fn test_non_mapping_root_fails() {
        let config = parse_project_str("p", "- a\n- b\n").unwrap();
        assert!(validate_project(&config, &registry()).is_err());
    }
}
