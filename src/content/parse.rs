use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid JSON in content index: {0}")]
    Json(#[from] serde_json::Error),
    #[error("content index must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("invalid entry for {key:?}: {source}")]
    Entry {
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(super) struct RawEntry {
    #[serde(default)]
    pub(super) title: Option<String>,
    #[serde(default)]
    pub(super) links: Vec<String>,
    #[serde(default)]
    pub(super) tags: Vec<String>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(super) fn parse_index_json(raw: &str) -> Result<BTreeMap<String, RawEntry>, ContentError> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let parsed: Value = serde_json::from_str(raw)?;
    let object = match parsed {
        Value::Object(object) => object,
        other => return Err(ContentError::NotAnObject(json_kind(&other))),
    };

    let mut entries = BTreeMap::new();
    for (key, value) in object {
        let entry = RawEntry::deserialize(value)
            .map_err(|source| ContentError::Entry {
                key: key.clone(),
                source,
            })?;
        entries.insert(key, entry);
    }

    Ok(entries)
}
