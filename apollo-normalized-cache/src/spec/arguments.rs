//! Field arguments and their canonical cache key form.

use apollo_compiler::ast;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Value;

/// An argument value as written in an operation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputValue {
    Null,
    /// A `$name` reference, resolved against the operation variables.
    Variable(String),
    Enum(String),
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::String(s.to_string())
    }
}

impl From<i64> for InputValue {
    fn from(i: i64) -> Self {
        InputValue::Int(i)
    }
}

impl From<bool> for InputValue {
    fn from(b: bool) -> Self {
        InputValue::Boolean(b)
    }
}

impl InputValue {
    pub fn variable(name: impl Into<String>) -> Self {
        InputValue::Variable(name.into())
    }

    pub fn enumeration(value: impl Into<String>) -> Self {
        InputValue::Enum(value.into())
    }

    /// Resolves variables and converts the value to JSON.
    ///
    /// Returns `None` for a variable that is not bound.
    pub fn evaluate(&self, variables: &Object) -> Option<Value> {
        Some(match self {
            InputValue::Null => Value::Null,
            InputValue::Variable(name) => return variables.get(name.as_str()).cloned(),
            InputValue::Enum(s) | InputValue::String(s) => Value::String(s.as_str().into()),
            InputValue::Int(i) => Value::Number((*i).into()),
            InputValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            InputValue::Boolean(b) => Value::Bool(*b),
            InputValue::List(values) => Value::Array(
                values
                    .iter()
                    .map(|v| v.evaluate(variables).unwrap_or(Value::Null))
                    .collect(),
            ),
            InputValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| {
                        (
                            k.as_str().into(),
                            v.evaluate(variables).unwrap_or(Value::Null),
                        )
                    })
                    .collect(),
            ),
        })
    }

    /// Canonical text of the value, independent of object key order.
    ///
    /// Returns `None` for a variable that is not bound.
    fn canonical(&self, variables: &Object) -> Option<String> {
        Some(match self {
            InputValue::Null => "null".to_string(),
            InputValue::Variable(name) => return variables.get(name.as_str()).map(canonical_json),
            InputValue::Enum(s) | InputValue::String(s) => s.clone(),
            InputValue::Int(i) => i.to_string(),
            InputValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(|number| number.to_string())
                .unwrap_or_else(|| "null".to_string()),
            InputValue::Boolean(b) => b.to_string(),
            InputValue::List(values) => format!(
                "[{}]",
                values
                    .iter()
                    .map(|v| v.canonical(variables).unwrap_or_else(|| "null".to_string()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            InputValue::Object(fields) => {
                let mut entries: Vec<(&str, String)> = fields
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str(), v.canonical(variables)?)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                canonical_object(entries)
            }
        })
    }
}

fn canonical_object<'a>(entries: impl IntoIterator<Item = (&'a str, String)>) -> String {
    format!(
        "{{{}}}",
        entries
            .into_iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(",")
    )
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.as_str().to_string(),
        Value::Array(values) => format!(
            "[{}]",
            values
                .iter()
                .map(canonical_json)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Object(object) => {
            let mut entries: Vec<(&str, String)> = object
                .iter()
                .map(|(k, v)| (k.as_str(), canonical_json(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            canonical_object(entries)
        }
    }
}

/// Computes the storage key of a field: its name, followed by its arguments sorted by name
/// when it has any, e.g. `hero(episode:JEDI)`.
///
/// Arguments bound to a variable that is absent from `variables` are left out.
pub fn field_cache_key(
    name: &str,
    arguments: &IndexMap<String, InputValue>,
    variables: &Object,
) -> String {
    if arguments.is_empty() {
        return name.to_string();
    }
    let mut args: Vec<(&str, String)> = arguments
        .iter()
        .filter_map(|(k, v)| Some((k.as_str(), v.canonical(variables)?)))
        .collect();
    if args.is_empty() {
        return name.to_string();
    }
    args.sort_by(|a, b| a.0.cmp(b.0));
    format!(
        "{name}({})",
        args.into_iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(",")
    )
}

impl From<&ast::Value> for InputValue {
    fn from(value: &ast::Value) -> Self {
        match value {
            ast::Value::Null => InputValue::Null,
            ast::Value::Variable(name) => InputValue::Variable(name.to_string()),
            ast::Value::Enum(name) => InputValue::Enum(name.to_string()),
            ast::Value::String(s) => InputValue::String(s.clone()),
            ast::Value::Int(i) => i
                .as_str()
                .parse::<i64>()
                .map(InputValue::Int)
                .unwrap_or_else(|_| InputValue::String(i.as_str().to_string())),
            ast::Value::Float(f) => f
                .as_str()
                .parse::<f64>()
                .map(InputValue::Float)
                .unwrap_or_else(|_| InputValue::String(f.as_str().to_string())),
            ast::Value::Boolean(b) => InputValue::Boolean(*b),
            ast::Value::List(values) => {
                InputValue::List(values.iter().map(|v| InputValue::from(&**v)).collect())
            }
            ast::Value::Object(fields) => InputValue::Object(
                fields
                    .iter()
                    .map(|(name, v)| (name.to_string(), InputValue::from(&**v)))
                    .collect(),
            ),
        }
    }
}
