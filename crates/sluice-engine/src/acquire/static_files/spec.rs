//! Parser specifications and directory resolution.

use std::path::PathBuf;

use serde_json::{Map, Value};
use sluice_types::state::is_truthy;
use sluice_types::ProjectName;

use crate::error::PipelineError;
use crate::files::dir_fmt;

pub const SOURCE_KEY: &str = "source";
pub const ON_FMT_KEY: &str = "on-fmt";
pub const ON_ERR_KEY: &str = "on-err";
pub const ON_RAW_KEY: &str = "on-raw";
pub const SUFFIX_KEY: &str = "suffix";
pub const PARSER_KEY: &str = "parser";

/// One entry of the static acquirer's `parser` list.
///
/// Besides `parser` and the directory keys, an entry may carry any
/// parser-specific options; the full entry is available to the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserSpec {
    parser: String,
    entry: Map<String, Value>,
}

impl ParserSpec {
    /// Build a spec from a config entry.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] unless `entry` is a mapping
    /// with a non-empty string `parser`.
    pub fn from_value(entry: &Value) -> Result<Self, PipelineError> {
        let Value::Object(map) = entry else {
            return Err(PipelineError::InvalidConfig(format!(
                "parser specification must be a mapping, got: {entry}"
            )));
        };
        let parser = match map.get(PARSER_KEY) {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => {
                return Err(PipelineError::InvalidConfig(format!(
                    "parser specification has no `{PARSER_KEY}` name: {entry}"
                )))
            }
        };
        Ok(Self {
            parser,
            entry: map.clone(),
        })
    }

    /// Shorthand for a spec with only a parser name.
    #[must_use]
    pub fn named(parser: &str) -> Self {
        let mut entry = Map::new();
        entry.insert(PARSER_KEY.to_string(), Value::String(parser.to_string()));
        Self {
            parser: parser.to_string(),
            entry,
        }
    }

    /// Name of the parser plugin; also the parser's state key.
    #[must_use]
    pub fn parser(&self) -> &str {
        &self.parser
    }

    /// Raw option lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entry.get(key)
    }

    /// The full config entry.
    #[must_use]
    pub fn options(&self) -> &Map<String, Value> {
        &self.entry
    }
}

/// Read the `parser` list of a static acquirer config node.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the list is absent, is not a
/// list, or holds a malformed entry.
pub fn parser_specs(config: &Value) -> Result<Vec<ParserSpec>, PipelineError> {
    match config.get(PARSER_KEY) {
        Some(Value::Array(entries)) => entries.iter().map(ParserSpec::from_value).collect(),
        Some(other) => Err(PipelineError::InvalidConfig(format!(
            "`{PARSER_KEY}` must be a list of parser specifications, got: {other}"
        ))),
        None => Err(PipelineError::InvalidConfig(format!(
            "static acquisition requires a `{PARSER_KEY}` list"
        ))),
    }
}

/// Where one parser spec reads from and moves files to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRoutes {
    pub source: PathBuf,
    pub on_fmt: PathBuf,
    pub on_err: PathBuf,
    pub on_raw: Option<PathBuf>,
    pub suffix: String,
}

impl FileRoutes {
    /// Resolve each option from the parser entry, then stage `settings`, then the
    /// default. A value present in the entry wins even when it is falsy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a falsy or non-string
    /// `source`, `on-fmt`, `on-err` or `suffix`, and for an `on-raw` that is
    /// neither falsy nor a string.
    pub fn resolve(
        project: &ProjectName,
        spec: &ParserSpec,
        settings: Option<&Map<String, Value>>,
    ) -> Result<Self, PipelineError> {
        let pick = |key: &str| spec.get(key).or_else(|| settings.and_then(|s| s.get(key)));

        let source = required_dir(
            spec,
            SOURCE_KEY,
            pick(SOURCE_KEY),
            || format!("tmp/inputs/{project}/"),
        )?;
        let on_fmt = required_dir(
            spec,
            ON_FMT_KEY,
            pick(ON_FMT_KEY),
            || format!("tmp/archive/{project}/static/"),
        )?;
        let on_err = required_dir(
            spec,
            ON_ERR_KEY,
            pick(ON_ERR_KEY),
            || format!("tmp/errors/{project}/static/"),
        )?;

        let on_raw = match pick(ON_RAW_KEY) {
            None => None,
            Some(v) if !is_truthy(v) => None,
            Some(Value::String(dir)) => Some(PathBuf::from(dir_fmt(dir))),
            Some(other) => {
                return Err(invalid_option(spec, ON_RAW_KEY, other));
            }
        };

        let suffix = match pick(SUFFIX_KEY) {
            None => "*".to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) => return Err(invalid_option(spec, SUFFIX_KEY, other)),
        };

        Ok(Self {
            source,
            on_fmt,
            on_err,
            on_raw,
            suffix,
        })
    }
}

fn required_dir(
    spec: &ParserSpec,
    key: &str,
    value: Option<&Value>,
    default: impl FnOnce() -> String,
) -> Result<PathBuf, PipelineError> {
    match value {
        None => Ok(PathBuf::from(default())),
        Some(Value::String(dir)) if !dir.is_empty() => Ok(PathBuf::from(dir_fmt(dir))),
        Some(other) => Err(invalid_option(spec, key, other)),
    }
}

fn invalid_option(spec: &ParserSpec, key: &str, value: &Value) -> PipelineError {
    PipelineError::InvalidConfig(format!(
        "parser `{}`: invalid `{key}` value: {value}",
        spec.parser()
    ))
}
