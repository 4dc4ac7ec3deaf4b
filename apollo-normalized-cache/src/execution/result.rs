use super::Accumulator;
use super::FieldInfo;
use super::ObjectInfo;
use crate::cache::FieldValue;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// Builds the JSON result of a selection set, keyed by response key.
///
/// References never reach it: the executor follows them before completing objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAccumulator;

impl Accumulator for ResultAccumulator {
    type PartialResult = Value;
    type FieldEntry = (String, Value);
    type ObjectResult = Object;
    type Output = Value;

    fn accept_scalar(&mut self, value: &FieldValue, _info: &FieldInfo<'_>) -> Value {
        value.to_json()
    }

    fn accept_null(&mut self, _info: &FieldInfo<'_>) -> Value {
        Value::Null
    }

    fn accept_missing(&mut self, _info: &FieldInfo<'_>) -> Value {
        Value::Null
    }

    fn accept_list(&mut self, list: Vec<Value>, _info: &FieldInfo<'_>) -> Value {
        Value::Array(list)
    }

    fn accept_child_object(&mut self, object: Object, _info: &FieldInfo<'_>) -> Value {
        Value::Object(object)
    }

    fn accept_field_entry(&mut self, value: Value, info: &FieldInfo<'_>) -> (String, Value) {
        (info.response_key.to_string(), value)
    }

    fn accept_object(&mut self, entries: Vec<(String, Value)>, _info: &ObjectInfo<'_>) -> Object {
        entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect()
    }

    fn finish(&mut self, root: Object, _info: &ObjectInfo<'_>) -> Value {
        Value::Object(root)
    }
}
