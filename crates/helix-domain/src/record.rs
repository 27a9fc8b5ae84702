use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecordError;

/// `simpleFields`: string → string.
pub type SimpleFields = BTreeMap<String, String>;
/// `listFields`: string → ordered sequence of string.
pub type ListFields = BTreeMap<String, Vec<String>>;
/// `mapFields`: string → (string → string).
pub type MapFields = BTreeMap<String, BTreeMap<String, String>>;

/// The universal value shape stored at every coordination-service path
/// relevant to Helix (a "ZNRecord" in the original implementation).
///
/// `BTreeMap` (rather than `HashMap`) is used throughout so canonical
/// serialization never depends on insertion order or a downstream crate's
/// `serde_json` feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, rename = "simpleFields")]
    pub simple_fields: SimpleFields,
    #[serde(default, rename = "listFields")]
    pub list_fields: ListFields,
    #[serde(default, rename = "mapFields")]
    pub map_fields: MapFields,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record { id: id.into(), ..Default::default() }
    }

    pub fn get_simple(&self, key: &str) -> Option<&str> {
        self.simple_fields.get(key).map(String::as_str)
    }

    pub fn set_simple(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.simple_fields.insert(key.into(), value.into());
    }

    pub fn map_entry(&mut self, key: impl Into<String>) -> &mut BTreeMap<String, String> {
        self.map_fields.entry(key.into()).or_default()
    }

    /// Serialize to the mandatory on-wire form: UTF-8 JSON, two-space
    /// indent, all keys sorted lexicographically at every level, all three
    /// sub-maps always present (even when empty). The controller reads
    /// these exact bytes, so this shape is not optional.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let mut top: BTreeMap<&'static str, Value> = BTreeMap::new();
        top.insert("id", Value::String(self.id.clone()));
        top.insert("simpleFields", serde_json::to_value(&self.simple_fields)?);
        top.insert("listFields", serde_json::to_value(&self.list_fields)?);
        top.insert("mapFields", serde_json::to_value(&self.map_fields)?);
        Ok(serde_json::to_vec_pretty(&top)?)
    }

    /// Parse from on-wire bytes. Missing `simpleFields`/`listFields`/
    /// `mapFields` are tolerated and treated as empty (`#[serde(default)]`
    /// on each field).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
