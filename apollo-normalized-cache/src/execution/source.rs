//! Where an execution reads its objects from.

use indexmap::IndexMap;

use crate::cache::FieldValue;
use crate::cache::RecordKey;
use crate::cache::RecordSet;
use crate::json_ext::Value;

/// An object being executed: its fields, and the key of the record holding them when it was
/// read from records.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub key: Option<&'a RecordKey>,
    pub fields: &'a IndexMap<String, FieldValue>,
}

/// A data source the executor reads objects from.
pub trait DataSource {
    /// The object at the root of the execution.
    fn root(&self, root_key: &RecordKey) -> Option<ObjectRef<'_>>;

    /// Picks the key a field is looked up with: the response key when reading a response, the
    /// storage key when reading records.
    fn field_key<'k>(&self, response_key: &'k str, storage_key: &'k str) -> &'k str;

    /// Follows a reference. `None` means the reference is dangling.
    fn resolve(&self, key: &RecordKey) -> Option<ObjectRef<'_>>;
}

/// A network response, read by response key.
#[derive(Debug, Clone)]
pub struct ResponseSource {
    data: FieldValue,
}

impl ResponseSource {
    pub fn new(data: &Value) -> Self {
        Self {
            data: FieldValue::from_response_json(data),
        }
    }
}

impl DataSource for ResponseSource {
    fn root(&self, _root_key: &RecordKey) -> Option<ObjectRef<'_>> {
        match &self.data {
            FieldValue::Object(fields) => Some(ObjectRef { key: None, fields }),
            _ => None,
        }
    }

    fn field_key<'k>(&self, response_key: &'k str, _storage_key: &'k str) -> &'k str {
        response_key
    }

    fn resolve(&self, _key: &RecordKey) -> Option<ObjectRef<'_>> {
        None
    }
}

/// Normalized records, read by storage key.
impl DataSource for RecordSet {
    fn root(&self, root_key: &RecordKey) -> Option<ObjectRef<'_>> {
        self.resolve(root_key)
    }

    fn field_key<'k>(&self, _response_key: &'k str, storage_key: &'k str) -> &'k str {
        storage_key
    }

    fn resolve(&self, key: &RecordKey) -> Option<ObjectRef<'_>> {
        self.get(key.as_str()).map(|record| ObjectRef {
            key: Some(record.key()),
            fields: record.fields(),
        })
    }
}
