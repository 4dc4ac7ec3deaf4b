use std::collections::BTreeSet;

use super::Accumulator;
use super::FieldInfo;
use super::ObjectInfo;
use crate::cache::ChangedKeys;
use crate::cache::FieldValue;

/// Collects the record fields an execution read, including the ones it found missing.
///
/// A result depends on exactly these fields: a change set touching none of them cannot change
/// the result.
#[derive(Debug, Default, Clone)]
pub struct DependencyTracker {
    dependent_keys: ChangedKeys,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields read so far, as `record key.storage key` paths.
    ///
    /// Available even when the execution failed at the root.
    pub fn dependent_keys(&self) -> &BTreeSet<String> {
        &self.dependent_keys
    }

    pub fn into_dependent_keys(self) -> BTreeSet<String> {
        self.dependent_keys
    }
}

impl Accumulator for DependencyTracker {
    type PartialResult = ();
    type FieldEntry = ();
    type ObjectResult = ();
    type Output = ();

    fn accept_scalar(&mut self, _value: &FieldValue, _info: &FieldInfo<'_>) {}

    fn accept_null(&mut self, _info: &FieldInfo<'_>) {}

    fn accept_missing(&mut self, _info: &FieldInfo<'_>) {}

    fn accept_list(&mut self, _list: Vec<()>, _info: &FieldInfo<'_>) {}

    fn accept_child_object(&mut self, _object: (), _info: &FieldInfo<'_>) {}

    fn accept_field_entry(&mut self, _value: (), info: &FieldInfo<'_>) {
        self.dependent_keys.insert(info.cache_path());
    }

    fn accept_field_error(&mut self, info: &FieldInfo<'_>) {
        self.dependent_keys.insert(info.cache_path());
    }

    fn accept_object(&mut self, _entries: Vec<()>, _info: &ObjectInfo<'_>) {}

    fn finish(&mut self, _root: (), _info: &ObjectInfo<'_>) {}
}
