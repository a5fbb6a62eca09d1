//! Record reshapers.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value as Json};
use sluice_types::{ProjectName, Record, StateBlob};

use crate::plugin::Reshaper;

/// Renames fields in place, keeping their position.
///
/// Config: `fields: {old: new, ...}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rename;

impl Rename {
    pub const ORD: i32 = 10;
}

impl Reshaper for Rename {
    fn ord(&self) -> i32 {
        Self::ORD
    }

    fn reshape(
        &self,
        _project: &ProjectName,
        config: &Json,
        _state: StateBlob,
        records: Vec<Record>,
    ) -> Result<(StateBlob, Vec<Record>)> {
        let Some(mapping) = config.get("fields").and_then(Json::as_object) else {
            bail!("rename requires a `fields` mapping");
        };
        let mut renames = Vec::with_capacity(mapping.len());
        for (old, new) in mapping {
            let Some(new) = new.as_str() else {
                bail!("rename target for `{old}` must be a string, got: {new}");
            };
            renames.push((old.as_str(), new));
        }

        let renamed = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| -> Result<Record> {
                let out = Record::from_fields(
                    record
                        .into_fields()
                        .into_iter()
                        .map(|(name, value)| {
                            let target = renames
                                .iter()
                                .find(|(old, _)| *old == name)
                                .map_or(name, |(_, new)| (*new).to_string());
                            (target, value)
                        })
                        .collect(),
                );
                out.validate()
                    .with_context(|| format!("rename broke record {index}"))?;
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((StateBlob::Empty, renamed))
    }
}

/// Drops records whose key was already seen, in this run or a previous one.
///
/// Config: `key: field | [field, ...]` (whole record when absent). Seen keys
/// are kept in state under `seen`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dedupe;

impl Dedupe {
    pub const ORD: i32 = 50;
}

fn key_fields(config: &Json) -> Result<Option<Vec<String>>> {
    match config.get("key") {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(field)) => Ok(Some(vec![field.clone()])),
        Some(Json::Array(fields)) => fields
            .iter()
            .map(|f| {
                f.as_str()
                    .map(str::to_string)
                    .with_context(|| format!("dedupe key fields must be strings, got: {f}"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => bail!("dedupe `key` must be a field name or list, got: {other}"),
    }
}

fn record_key(record: &Record, fields: Option<&[String]>) -> Result<String> {
    let key = match fields {
        Some(fields) => {
            let values: Vec<_> = fields.iter().map(|f| record.get(f)).collect();
            serde_json::to_string(&values)?
        }
        None => serde_json::to_string(record)?,
    };
    Ok(key)
}

impl Reshaper for Dedupe {
    fn ord(&self) -> i32 {
        Self::ORD
    }

    fn reshape(
        &self,
        _project: &ProjectName,
        config: &Json,
        state: StateBlob,
        records: Vec<Record>,
    ) -> Result<(StateBlob, Vec<Record>)> {
        let fields = key_fields(config)?;
        let mut seen: Vec<String> = state
            .get("seen")
            .and_then(Json::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Json::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let mut lookup: HashSet<String> = seen.iter().cloned().collect();

        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            let key = record_key(&record, fields.as_deref())?;
            if lookup.insert(key.clone()) {
                seen.push(key);
                kept.push(record);
            }
        }

        let state = if seen.is_empty() {
            StateBlob::Empty
        } else {
            StateBlob::new(json!({ "seen": seen }))
        };
        Ok((state, kept))
    }
}
