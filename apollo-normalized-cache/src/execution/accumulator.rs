use crate::cache::FieldValue;
use crate::cache::RecordKey;
use crate::json_ext::Path;
use crate::spec::Field;

/// The field being completed.
#[derive(Debug, Clone)]
pub struct FieldInfo<'a> {
    /// The first of the fields merged under this response key.
    pub field: &'a Field,
    pub response_key: &'a str,
    /// Name and canonical arguments of the field, as stored in records.
    pub storage_key: String,
    /// Path of the field in the response.
    pub path: Path,
    /// Key of the record the field belongs to.
    pub record_key: RecordKey,
}

impl FieldInfo<'_> {
    /// Path of the field in the records, as reported in change sets.
    pub fn cache_path(&self) -> String {
        self.record_key.field_path(&self.storage_key)
    }
}

/// The object being completed.
#[derive(Debug, Clone)]
pub struct ObjectInfo<'a> {
    /// Key of the record holding the object: its identity, or its path from the root record.
    pub record_key: RecordKey,
    /// The runtime type of the object, when it is known.
    pub typename: Option<&'a str>,
    pub path: Path,
}

/// Decides what an execution produces.
///
/// The executor walks the selection set and the data source, and hands every completed value
/// to the accumulator: leaves first, then lists and objects built from them, up to the root.
pub trait Accumulator {
    type PartialResult;
    type FieldEntry;
    type ObjectResult;
    type Output;

    fn accept_scalar(&mut self, value: &FieldValue, info: &FieldInfo<'_>) -> Self::PartialResult;

    /// An explicit null.
    fn accept_null(&mut self, info: &FieldInfo<'_>) -> Self::PartialResult;

    /// A value absent from the result: missing from the data source, or nulled by an error.
    fn accept_missing(&mut self, info: &FieldInfo<'_>) -> Self::PartialResult;

    fn accept_list(
        &mut self,
        list: Vec<Self::PartialResult>,
        info: &FieldInfo<'_>,
    ) -> Self::PartialResult;

    fn accept_child_object(
        &mut self,
        object: Self::ObjectResult,
        info: &FieldInfo<'_>,
    ) -> Self::PartialResult;

    fn accept_field_entry(
        &mut self,
        value: Self::PartialResult,
        info: &FieldInfo<'_>,
    ) -> Self::FieldEntry;

    /// A field whose error propagated to its parent object.
    fn accept_field_error(&mut self, _info: &FieldInfo<'_>) {}

    fn accept_object(
        &mut self,
        entries: Vec<Self::FieldEntry>,
        info: &ObjectInfo<'_>,
    ) -> Self::ObjectResult;

    fn finish(&mut self, root: Self::ObjectResult, info: &ObjectInfo<'_>) -> Self::Output;

    /// The fields of the root object that completed, when an error reached the root.
    fn accept_failed_root(&mut self, _entries: Vec<Self::FieldEntry>, _info: &ObjectInfo<'_>) {}
}

/// Runs two accumulators over a single execution.
#[derive(Debug, Default)]
pub struct Zip<A, B>(pub A, pub B);

impl<A: Accumulator, B: Accumulator> Accumulator for Zip<A, B> {
    type PartialResult = (A::PartialResult, B::PartialResult);
    type FieldEntry = (A::FieldEntry, B::FieldEntry);
    type ObjectResult = (A::ObjectResult, B::ObjectResult);
    type Output = (A::Output, B::Output);

    fn accept_scalar(&mut self, value: &FieldValue, info: &FieldInfo<'_>) -> Self::PartialResult {
        (
            self.0.accept_scalar(value, info),
            self.1.accept_scalar(value, info),
        )
    }

    fn accept_null(&mut self, info: &FieldInfo<'_>) -> Self::PartialResult {
        (self.0.accept_null(info), self.1.accept_null(info))
    }

    fn accept_missing(&mut self, info: &FieldInfo<'_>) -> Self::PartialResult {
        (self.0.accept_missing(info), self.1.accept_missing(info))
    }

    fn accept_list(
        &mut self,
        list: Vec<Self::PartialResult>,
        info: &FieldInfo<'_>,
    ) -> Self::PartialResult {
        let (a, b): (Vec<_>, Vec<_>) = list.into_iter().unzip();
        (self.0.accept_list(a, info), self.1.accept_list(b, info))
    }

    fn accept_child_object(
        &mut self,
        (a, b): Self::ObjectResult,
        info: &FieldInfo<'_>,
    ) -> Self::PartialResult {
        (
            self.0.accept_child_object(a, info),
            self.1.accept_child_object(b, info),
        )
    }

    fn accept_field_entry(
        &mut self,
        (a, b): Self::PartialResult,
        info: &FieldInfo<'_>,
    ) -> Self::FieldEntry {
        (
            self.0.accept_field_entry(a, info),
            self.1.accept_field_entry(b, info),
        )
    }

    fn accept_field_error(&mut self, info: &FieldInfo<'_>) {
        self.0.accept_field_error(info);
        self.1.accept_field_error(info);
    }

    fn accept_object(
        &mut self,
        entries: Vec<Self::FieldEntry>,
        info: &ObjectInfo<'_>,
    ) -> Self::ObjectResult {
        let (a, b): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        (self.0.accept_object(a, info), self.1.accept_object(b, info))
    }

    fn finish(&mut self, (a, b): Self::ObjectResult, info: &ObjectInfo<'_>) -> Self::Output {
        (self.0.finish(a, info), self.1.finish(b, info))
    }

    fn accept_failed_root(&mut self, entries: Vec<Self::FieldEntry>, info: &ObjectInfo<'_>) {
        let (a, b): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        self.0.accept_failed_root(a, info);
        self.1.accept_failed_root(b, info);
    }
}
