//! Failure journal types.
//!
//! A [`FailureNote`] is appended whenever an error is swallowed rather than
//! propagated: a quarantined file, or a project that failed in wrapped mode.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::ProjectName;

/// ISO-8601 formatted timestamp string.
///
/// Stored and compared as text; the state backend formats it with `chrono`
/// when a note is recorded. Callers are trusted to provide valid ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Create a new timestamp from an ISO-8601 string.
    #[must_use]
    pub fn new(iso8601: impl Into<String>) -> Self {
        Self(iso8601.into())
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A structured error note for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNote {
    /// Project the failure belongs to.
    pub project: ProjectName,
    /// Human-readable error description, including its cause chain.
    pub message: String,
    /// Where it happened (e.g. the quarantined file path), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// When the failure was recorded.
    pub recorded_at: Timestamp,
}
