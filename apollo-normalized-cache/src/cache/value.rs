use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::cache::RecordKey;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// Key of the object tagging a reference in the persisted format.
pub(crate) const REFERENCE_KEY: &str = "__ref";

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A value stored in a record, or read from a response.
///
/// `Missing` and `Null` are different: `Missing` means the key was absent from where it was
/// read, `Null` that it was present and explicitly null.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    Null,
    #[default]
    Missing,
    Scalar(Scalar),
    List(Vec<FieldValue>),
    /// Points at another record of the same record set.
    Reference(RecordKey),
    /// An object embedded in place: a response object not yet normalized, or the value of a
    /// custom scalar.
    Object(IndexMap<String, FieldValue>),
}

impl FieldValue {
    pub fn string(s: impl Into<String>) -> Self {
        FieldValue::Scalar(Scalar::String(s.into()))
    }

    pub fn reference(key: impl Into<RecordKey>) -> Self {
        FieldValue::Reference(key.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&RecordKey> {
        match self {
            FieldValue::Reference(key) => Some(key),
            _ => None,
        }
    }

    /// Converts response JSON. Objects stay embedded: references only come out of
    /// normalization.
    pub fn from_response_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Scalar(Scalar::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Scalar(Scalar::Int(i)),
                None => n
                    .as_f64()
                    .map(|f| FieldValue::Scalar(Scalar::Float(f)))
                    .unwrap_or(FieldValue::Null),
            },
            Value::String(s) => FieldValue::string(s.as_str()),
            Value::Array(values) => {
                FieldValue::List(values.iter().map(FieldValue::from_response_json).collect())
            }
            Value::Object(object) => FieldValue::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), FieldValue::from_response_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts persisted JSON, where `{"__ref": key}` objects are references.
    pub fn from_persisted_json(value: &Value) -> Self {
        match value {
            Value::Array(values) => {
                FieldValue::List(values.iter().map(FieldValue::from_persisted_json).collect())
            }
            Value::Object(object) => {
                if object.len() == 1 {
                    if let Some(Value::String(key)) = object.get(REFERENCE_KEY) {
                        return FieldValue::reference(key.as_str());
                    }
                }
                FieldValue::Object(
                    object
                        .iter()
                        .map(|(k, v)| (k.as_str().to_string(), FieldValue::from_persisted_json(v)))
                        .collect(),
                )
            }
            other => FieldValue::from_response_json(other),
        }
    }

    /// Converts to JSON. References become `{"__ref": key}` and missing values become null.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null | FieldValue::Missing => Value::Null,
            FieldValue::Scalar(Scalar::String(s)) => Value::String(s.as_str().into()),
            FieldValue::Scalar(Scalar::Int(i)) => Value::Number((*i).into()),
            FieldValue::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Scalar(Scalar::Boolean(b)) => Value::Bool(*b),
            FieldValue::List(values) => {
                Value::Array(values.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Reference(key) => {
                let mut object = Object::new();
                object.insert(REFERENCE_KEY, Value::String(key.as_str().into()));
                Value::Object(object)
            }
            FieldValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .filter(|(_, v)| !v.is_missing())
                    .map(|(k, v)| (k.as_str().into(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(scalar: Scalar) -> Self {
        FieldValue::Scalar(scalar)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::string(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Scalar(Scalar::Int(i))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Scalar(Scalar::Boolean(b))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(values: Vec<FieldValue>) -> Self {
        FieldValue::List(values)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from_persisted_json(&value))
    }
}
