//! Project state model types.
//!
//! Pure data types shared by the state backend and the engine. Kept in the
//! types crate so both can use them without circular dependencies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque project identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    /// Create a new project name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProjectName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// State blobs
// ---------------------------------------------------------------------------

/// Loose truthiness for JSON values: `null`, `false`, `0`, `""`,
/// `[]` and `{}` are falsy.
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value as J;
    match value {
        J::Null => false,
        J::Bool(b) => *b,
        J::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        J::String(s) => !s.is_empty(),
        J::Array(a) => !a.is_empty(),
        J::Object(o) => !o.is_empty(),
    }
}

/// Opaque persisted data owned by one sub-module.
///
/// `Empty` is the explicit "no state" variant; constructing a blob from a
/// falsy JSON value always yields `Empty`, so "never had state" and "state
/// cleared" are the same thing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StateBlob {
    #[default]
    Empty,
    Value(serde_json::Value),
}

impl StateBlob {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        if is_truthy(&value) {
            Self::Value(value)
        } else {
            Self::Empty
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Empty => None,
            Self::Value(v) => Some(v),
        }
    }

    /// Look up a key when the blob is a JSON object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.as_value().and_then(|v| v.get(key))
    }

    /// Unwrap into JSON; `Empty` becomes an empty object.
    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Object(serde_json::Map::new()),
            Self::Value(v) => v,
        }
    }
}

impl From<serde_json::Value> for StateBlob {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// Per-project mapping from sub-module name to its state blob.
///
/// A key is present iff the sub-module's last successful run returned a
/// non-empty blob. [`ProjectState::apply`] is the only way a stage changes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectState(BTreeMap<String, serde_json::Value>);

impl ProjectState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored slice for `name`, or `Empty`.
    #[must_use]
    pub fn slice(&self, name: &str) -> StateBlob {
        self.0
            .get(name)
            .cloned()
            .map_or(StateBlob::Empty, StateBlob::new)
    }

    /// Store `blob` under `name`, or remove the key when the blob is empty.
    /// Returns `true` if the key is present afterwards.
    pub fn apply(&mut self, name: &str, blob: StateBlob) -> bool {
        match blob {
            StateBlob::Empty => {
                self.0.remove(name);
                false
            }
            StateBlob::Value(v) => {
                self.0.insert(name.to_string(), v);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unpack a nested state map from a blob. Non-object blobs and falsy
    /// entries are dropped.
    #[must_use]
    pub fn from_blob(blob: StateBlob) -> Self {
        let mut state = Self::new();
        if let StateBlob::Value(serde_json::Value::Object(map)) = blob {
            for (k, v) in map {
                state.apply(&k, StateBlob::new(v));
            }
        }
        state
    }

    /// Pack into a blob; an empty map becomes `Empty`.
    #[must_use]
    pub fn into_blob(self) -> StateBlob {
        StateBlob::new(serde_json::Value::Object(self.0.into_iter().collect()))
    }
}

impl FromIterator<(String, serde_json::Value)> for ProjectState {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (k, v) in iter {
            state.apply(&k, StateBlob::new(v));
        }
        state
    }
}

// ---------------------------------------------------------------------------
// Run tracking
// ---------------------------------------------------------------------------

/// Status of a project run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate statistics for a finished project run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub records_acquired: u64,
    pub records_exported: u64,
    pub files_parsed: u64,
    pub files_quarantined: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
