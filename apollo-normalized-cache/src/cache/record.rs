use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::cache::FieldValue;
use crate::error::CacheError;
use crate::json_ext::Object;
use crate::json_ext::Value;

pub const QUERY_ROOT: &str = "QUERY_ROOT";
pub const MUTATION_ROOT: &str = "MUTATION_ROOT";
pub const SUBSCRIPTION_ROOT: &str = "SUBSCRIPTION_ROOT";

/// Paths of the fields changed by a merge, as `recordKey.storageKey`.
pub type ChangedKeys = BTreeSet<String>;

/// Identifies a record: either an object identity (`Human:1000`) or the path of the object
/// from a root record (`QUERY_ROOT.hero.friends.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        RecordKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key of an object with no identity, reached through `storage_key` from this record.
    pub fn child(&self, storage_key: &str) -> Self {
        RecordKey(format!("{}.{storage_key}", self.0))
    }

    /// The key of the element at `index` of a list stored under this key.
    pub fn index(&self, index: usize) -> Self {
        RecordKey(format!("{}.{index}", self.0))
    }

    /// The path of a field of this record, as reported in change sets.
    pub fn field_path(&self, storage_key: &str) -> String {
        format!("{}.{storage_key}", self.0)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(key: &str) -> Self {
        RecordKey(key.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(key: String) -> Self {
        RecordKey(key)
    }
}

impl From<&RecordKey> for RecordKey {
    fn from(key: &RecordKey) -> Self {
        key.clone()
    }
}

impl Borrow<str> for RecordKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The fields of one object, keyed by storage key.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    key: RecordKey,
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_fields(
        key: impl Into<RecordKey>,
        fields: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> Self {
        let mut record = Record::new(key);
        for (storage_key, value) in fields {
            record.insert(storage_key, value);
        }
        record
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, storage_key: &str) -> Option<&FieldValue> {
        self.fields.get(storage_key)
    }

    /// Sets a field. Missing values are never stored.
    pub fn insert(&mut self, storage_key: impl Into<String>, value: FieldValue) {
        if !value.is_missing() {
            self.fields.insert(storage_key.into(), value);
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Writes every field of `other` over this record and returns the paths of the fields whose
    /// value changed. Fields absent from `other` are kept.
    pub fn merge(&mut self, other: Record) -> ChangedKeys {
        let mut changed = ChangedKeys::new();
        for (storage_key, value) in other.fields {
            if value.is_missing() {
                continue;
            }
            if self.fields.get(&storage_key) != Some(&value) {
                changed.insert(self.key.field_path(&storage_key));
                self.fields.insert(storage_key, value);
            }
        }
        changed
    }

    /// Adds the fields of `other` this record does not have yet.
    pub(crate) fn absorb(&mut self, other: Record) {
        for (storage_key, value) in other.fields {
            if !value.is_missing() && !self.fields.contains_key(&storage_key) {
                self.fields.insert(storage_key, value);
            }
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields_to_json())
    }

    fn fields_to_json(&self) -> Object {
        self.fields
            .iter()
            .map(|(storage_key, value)| (storage_key.as_str().into(), value.to_json()))
            .collect()
    }

    /// Decodes a persisted record: a JSON object of fields.
    pub fn from_json(key: impl Into<RecordKey>, value: &Value) -> Result<Self, CacheError> {
        let key = key.into();
        let fields = value
            .as_object()
            .ok_or_else(|| CacheError::InvalidRecord {
                key: key.to_string(),
                reason: "expected a JSON object of fields".to_string(),
            })?;
        Ok(Record::with_fields(
            key,
            fields.iter().map(|(storage_key, value)| {
                (
                    storage_key.as_str().to_string(),
                    FieldValue::from_persisted_json(value),
                )
            }),
        ))
    }
}

/// A set of records, keyed by record key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: IndexMap<RecordKey, Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Merges a record into the set, see [`Record::merge`].
    pub fn merge(&mut self, record: Record) -> ChangedKeys {
        match self.records.get_mut(record.key()) {
            Some(existing) => existing.merge(record),
            None => {
                let changed = record
                    .fields
                    .keys()
                    .map(|storage_key| record.key.field_path(storage_key))
                    .collect();
                self.records.insert(record.key.clone(), record);
                changed
            }
        }
    }

    /// Merges every record of `records` into the set, returning the union of the changed paths.
    pub fn merge_records(&mut self, records: RecordSet) -> ChangedKeys {
        let mut changed = ChangedKeys::new();
        for record in records.records.into_values() {
            changed.extend(self.merge(record));
        }
        changed
    }

    /// Adds `record` without overwriting fields already present.
    pub(crate) fn absorb(&mut self, record: Record) {
        match self.records.get_mut(record.key()) {
            Some(existing) => existing.absorb(record),
            None => {
                self.records.insert(record.key.clone(), record);
            }
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Encodes the set as a JSON object of records keyed by record key.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.records
                .iter()
                .map(|(key, record)| (key.as_str().into(), record.to_json()))
                .collect(),
        )
    }

    pub fn from_json(value: &Value) -> Result<Self, CacheError> {
        let records = value.as_object().ok_or_else(|| CacheError::InvalidRecord {
            key: String::new(),
            reason: "expected a JSON object of records".to_string(),
        })?;
        records
            .iter()
            .map(|(key, fields)| Record::from_json(key.as_str(), fields))
            .collect()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut set = RecordSet::new();
        for record in iter {
            set.merge(record);
        }
        set
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = indexmap::map::IntoValues<RecordKey, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields_to_json().serialize(serializer)
    }
}

impl Serialize for RecordSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RecordSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RecordSet::from_json(&value).map_err(serde::de::Error::custom)
    }
}
