use super::Accumulator;
use super::ExecutionResult;
use super::Executor;
use super::FieldInfo;
use super::ObjectInfo;
use super::ResponseSource;
use crate::cache::CacheKeyResolver;
use crate::cache::FieldValue;
use crate::cache::Record;
use crate::cache::RecordKey;
use crate::cache::RecordSet;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::Schema;
use crate::spec::SelectionSet;

/// Splits a response into flat records.
///
/// Every object becomes a record under its identity, or under its path when it has none, and
/// the fields pointing at it hold references. Records travel with the partial results, so that
/// a subtree nulled by an error leaves nothing behind.
///
/// When an error reaches the root, the root fields that completed are kept aside, see
/// [`NormalizingAccumulator::take_completed`].
#[derive(Debug, Default, Clone)]
pub struct NormalizingAccumulator {
    completed: RecordSet,
}

impl NormalizingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the records of the root fields that completed in an execution whose root failed.
    pub fn take_completed(&mut self) -> RecordSet {
        std::mem::take(&mut self.completed)
    }

    fn object_records(
        entries: Vec<(String, FieldValue, Vec<Record>)>,
        record_key: &RecordKey,
    ) -> Vec<Record> {
        let mut record = Record::new(record_key.clone());
        let mut children = Vec::new();
        for (storage_key, value, records) in entries {
            record.insert(storage_key, value);
            children.extend(records);
        }
        let mut records = Vec::with_capacity(children.len() + 1);
        records.push(record);
        records.extend(children);
        records
    }
}

impl Accumulator for NormalizingAccumulator {
    type PartialResult = (FieldValue, Vec<Record>);
    type FieldEntry = (String, FieldValue, Vec<Record>);
    type ObjectResult = (RecordKey, Vec<Record>);
    type Output = RecordSet;

    fn accept_scalar(&mut self, value: &FieldValue, _info: &FieldInfo<'_>) -> Self::PartialResult {
        (value.clone(), Vec::new())
    }

    fn accept_null(&mut self, _info: &FieldInfo<'_>) -> Self::PartialResult {
        (FieldValue::Null, Vec::new())
    }

    fn accept_missing(&mut self, _info: &FieldInfo<'_>) -> Self::PartialResult {
        (FieldValue::Missing, Vec::new())
    }

    fn accept_list(
        &mut self,
        list: Vec<Self::PartialResult>,
        _info: &FieldInfo<'_>,
    ) -> Self::PartialResult {
        // a partially nulled list is not written, so that a later read reports the miss
        if list.iter().any(|(value, _)| value.is_missing()) {
            return (FieldValue::Missing, Vec::new());
        }
        let mut records = Vec::new();
        let values = list
            .into_iter()
            .map(|(value, element_records)| {
                records.extend(element_records);
                value
            })
            .collect();
        (FieldValue::List(values), records)
    }

    fn accept_child_object(
        &mut self,
        (key, records): Self::ObjectResult,
        _info: &FieldInfo<'_>,
    ) -> Self::PartialResult {
        (FieldValue::Reference(key), records)
    }

    fn accept_field_entry(
        &mut self,
        (value, records): Self::PartialResult,
        info: &FieldInfo<'_>,
    ) -> Self::FieldEntry {
        (info.storage_key.clone(), value, records)
    }

    fn accept_object(
        &mut self,
        entries: Vec<Self::FieldEntry>,
        info: &ObjectInfo<'_>,
    ) -> Self::ObjectResult {
        (
            info.record_key.clone(),
            Self::object_records(entries, &info.record_key),
        )
    }

    fn finish(&mut self, (_, records): Self::ObjectResult, _info: &ObjectInfo<'_>) -> RecordSet {
        let mut record_set = RecordSet::new();
        for record in records {
            record_set.absorb(record);
        }
        record_set
    }

    fn accept_failed_root(&mut self, entries: Vec<Self::FieldEntry>, info: &ObjectInfo<'_>) {
        if entries.is_empty() {
            return;
        }
        for record in Self::object_records(entries, &info.record_key) {
            self.completed.absorb(record);
        }
    }
}

/// Normalizes the `data` of a response to `selection_set` into records, the root object being
/// stored under `root_key`.
///
/// When an error reaches the root, `data` still holds the records of the root fields that
/// completed, and the error is reported in `errors`.
pub fn normalize(
    selection_set: &SelectionSet,
    data: &Value,
    variables: &Object,
    root_key: &RecordKey,
    schema: &Schema,
    cache_keys: &CacheKeyResolver,
) -> ExecutionResult<RecordSet> {
    let source = ResponseSource::new(data);
    let mut accumulator = NormalizingAccumulator::new();
    let mut result = Executor::new(&source, schema, variables)
        .with_cache_keys(cache_keys)
        .execute(selection_set, root_key, &mut accumulator);
    if result.data.is_none() {
        let completed = accumulator.take_completed();
        if !completed.is_empty() {
            result.data = Some(completed);
        }
    }
    result
}
