//! Ordered field/value rows produced by acquisition plugins.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// Why a record failed the well-formedness check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("field {position} has an empty name")]
    EmptyFieldName { position: usize },

    #[error("field '{name}' appears more than once")]
    DuplicateField { name: String },
}

/// One acquired or transformed data row: an ordered mapping of field name
/// to scalar [`Value`].
///
/// Records built through [`Record::insert`] are always well formed.
/// [`Record::from_fields`] accepts raw pairs as-is; the engine checks those
/// with [`Record::validate`] before accepting them into a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from raw pairs without checking them.
    #[must_use]
    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set `name` to `value`. An existing field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the record, yielding its fields in order.
    #[must_use]
    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    /// Check that every field name is non-empty and unique.
    ///
    /// # Errors
    ///
    /// Returns the first [`RecordError`] found.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (position, (name, _)) in self.fields.iter().enumerate() {
            if name.is_empty() {
                return Err(RecordError::EmptyFieldName { position });
            }
            if self.fields[..position].iter().any(|(n, _)| n == name) {
                return Err(RecordError::DuplicateField { name: name.clone() });
            }
        }
        Ok(())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat object of scalar fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((name, value)) = access.next_entry::<String, Value>()? {
            record.insert(name, value);
        }
        Ok(record)
    }
}

/// Deserialization keeps source field order.
impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}
