//! Selection set execution.
//!
//! The executor walks a selection set against a [`DataSource`], either a network response or
//! normalized records, and hands every completed value to an [`Accumulator`] deciding what the
//! execution produces.

mod accumulator;
mod dependencies;
mod normalizer;
mod result;
mod source;

use indexmap::IndexMap;

pub use self::accumulator::Accumulator;
pub use self::accumulator::FieldInfo;
pub use self::accumulator::ObjectInfo;
pub use self::accumulator::Zip;
pub use self::dependencies::DependencyTracker;
pub use self::normalizer::NormalizingAccumulator;
pub use self::normalizer::normalize;
pub use self::result::ResultAccumulator;
pub use self::source::DataSource;
pub use self::source::ObjectRef;
pub use self::source::ResponseSource;
use crate::cache::CacheKeyResolver;
use crate::cache::FieldValue;
use crate::cache::RecordKey;
use crate::cache::Scalar;
use crate::configuration::MissingFieldPolicy;
use crate::error::ExecutionError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::spec::Field;
use crate::spec::FieldType;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::SelectionSet;
use crate::spec::TYPENAME;

static MISSING: FieldValue = FieldValue::Missing;

/// The output of an execution, and the errors met along the way.
///
/// `data` is `None` when an error reached the root of the selection set.
#[derive(Debug)]
pub struct ExecutionResult<O> {
    pub data: Option<O>,
    pub errors: Vec<ExecutionError>,
}

/// Where a value sits: its path in the response, and the key an object found there is stored
/// under when it has no identity.
#[derive(Debug, Clone)]
struct Position {
    path: Path,
    cache_path: RecordKey,
}

type FieldGroups<'a> = IndexMap<&'a str, Vec<&'a Field>>;

/// Executes selection sets against a data source.
pub struct Executor<'a, S: ?Sized> {
    source: &'a S,
    schema: &'a Schema,
    variables: &'a Object,
    cache_keys: Option<&'a CacheKeyResolver>,
    missing_nullable_fields: MissingFieldPolicy,
    errors: Vec<ExecutionError>,
}

impl<'a, S> Executor<'a, S>
where
    S: DataSource + ?Sized,
{
    pub fn new(source: &'a S, schema: &'a Schema, variables: &'a Object) -> Self {
        Self {
            source,
            schema,
            variables,
            cache_keys: None,
            missing_nullable_fields: MissingFieldPolicy::default(),
            errors: Vec::new(),
        }
    }

    /// Resolves the identity of objects that are not read from records, so that they get the
    /// record key normalization would store them under.
    pub fn with_cache_keys(mut self, cache_keys: &'a CacheKeyResolver) -> Self {
        self.cache_keys = Some(cache_keys);
        self
    }

    pub fn with_missing_nullable_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_nullable_fields = policy;
        self
    }

    /// Executes `selection_set` on the object stored under `root_key`.
    #[tracing::instrument(skip_all, level = "trace", fields(root_key = %root_key))]
    pub fn execute<A: Accumulator>(
        mut self,
        selection_set: &'a SelectionSet,
        root_key: &RecordKey,
        accumulator: &mut A,
    ) -> ExecutionResult<A::Output> {
        let Some(root) = self.source.root(root_key) else {
            tracing::trace!("no root object");
            return ExecutionResult {
                data: None,
                errors: vec![ExecutionError::MissingValue {
                    path: Path::empty(),
                }],
            };
        };

        let root_type = selection_set.parent_type.as_str();
        let info = ObjectInfo {
            record_key: root_key.clone(),
            typename: Some(root_type),
            path: Path::empty(),
        };
        let mut groups = FieldGroups::new();
        self.collect_fields(
            &selection_set.selections,
            root_type,
            Some(root_type),
            &mut groups,
        );

        let (entries, error) = self.execute_fields(root, groups, &info, accumulator);
        let data = match error {
            None => {
                let root = accumulator.accept_object(entries, &info);
                Some(accumulator.finish(root, &info))
            }
            Some(error) => {
                accumulator.accept_failed_root(entries, &info);
                self.errors.push(error);
                None
            }
        };
        tracing::trace!(errors = self.errors.len(), "executed selection set");
        ExecutionResult {
            data,
            errors: self.errors,
        }
    }

    /// Groups the fields applying to an object by response key, after evaluating conditions and
    /// type conditions.
    fn collect_fields(
        &self,
        selections: &'a [Selection],
        declared_type: &str,
        runtime_type: Option<&str>,
        groups: &mut FieldGroups<'a>,
    ) {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    groups.entry(field.response_key()).or_default().push(field);
                }
                Selection::InlineFragment(inline_fragment) => {
                    let applies = inline_fragment
                        .type_condition
                        .as_deref()
                        .map(|condition| {
                            self.does_type_apply(condition, declared_type, runtime_type)
                        })
                        .unwrap_or(true);
                    if applies {
                        self.collect_fields(
                            &inline_fragment.selection_set.selections,
                            declared_type,
                            runtime_type,
                            groups,
                        );
                    }
                }
                Selection::FragmentSpread(fragment) => {
                    if self.does_type_apply(&fragment.type_condition, declared_type, runtime_type)
                    {
                        self.collect_fields(
                            &fragment.selection_set.selections,
                            declared_type,
                            runtime_type,
                            groups,
                        );
                    }
                }
                Selection::Conditional(conditional) => {
                    if !conditional.include_skip.should_skip(self.variables) {
                        self.collect_fields(
                            &conditional.selections,
                            declared_type,
                            runtime_type,
                            groups,
                        );
                    }
                }
            }
        }
    }

    fn does_type_apply(
        &self,
        type_condition: &str,
        declared_type: &str,
        runtime_type: Option<&str>,
    ) -> bool {
        type_condition == declared_type
            || runtime_type
                .map(|runtime_type| self.schema.satisfies(type_condition, runtime_type))
                .unwrap_or(false)
    }

    /// The runtime type of an object: its `__typename`, else the declared type when it is
    /// concrete.
    fn runtime_type(&self, object: ObjectRef<'a>, declared_type: &'a str) -> Option<&'a str> {
        match object.fields.get(TYPENAME) {
            Some(FieldValue::Scalar(Scalar::String(typename))) => {
                if !self.schema.has_type(typename) && self.schema.has_type(declared_type) {
                    failfast_debug!("typename {typename} is not in the schema");
                }
                Some(typename.as_str())
            }
            _ if self.schema.is_abstract(declared_type) => None,
            _ => Some(declared_type),
        }
    }

    fn execute_object<A: Accumulator>(
        &mut self,
        object: ObjectRef<'a>,
        groups: FieldGroups<'a>,
        info: &ObjectInfo<'a>,
        accumulator: &mut A,
    ) -> Result<A::ObjectResult, ExecutionError> {
        match self.execute_fields(object, groups, info, accumulator) {
            (entries, None) => Ok(accumulator.accept_object(entries, info)),
            (_, Some(error)) => Err(error),
        }
    }

    /// Completes the fields of an object, and returns the entries of those that succeeded along
    /// with the first error to propagate to the object.
    ///
    /// Siblings of a failed field are still executed. Their errors are recorded, and only the
    /// first one is returned.
    fn execute_fields<A: Accumulator>(
        &mut self,
        object: ObjectRef<'a>,
        groups: FieldGroups<'a>,
        info: &ObjectInfo<'a>,
        accumulator: &mut A,
    ) -> (Vec<A::FieldEntry>, Option<ExecutionError>) {
        let mut entries = Vec::with_capacity(groups.len());
        let mut first_error = None;

        for (response_key, fields) in groups {
            let Some(&field) = fields.first() else {
                continue;
            };
            let field_info = FieldInfo {
                field,
                response_key,
                storage_key: field.cache_key(self.variables),
                path: info.path.with_key(response_key),
                record_key: info.record_key.clone(),
            };
            let value = object
                .fields
                .get(self.source.field_key(response_key, &field_info.storage_key))
                .unwrap_or(&MISSING);

            let completed = match info.typename {
                Some(typename) if field.is_typename() && value.is_missing() => {
                    Ok(accumulator.accept_scalar(&FieldValue::string(typename), &field_info))
                }
                _ => {
                    let position = Position {
                        path: field_info.path.clone(),
                        cache_path: info.record_key.child(&field_info.storage_key),
                    };
                    self.complete_value(
                        &field.field_type,
                        &fields,
                        value,
                        position,
                        &field_info,
                        accumulator,
                    )
                }
            };

            match completed {
                Ok(partial) => entries.push(accumulator.accept_field_entry(partial, &field_info)),
                Err(error) => {
                    accumulator.accept_field_error(&field_info);
                    if first_error.is_none() {
                        first_error = Some(error);
                    } else {
                        self.errors.push(error);
                    }
                }
            }
        }

        (entries, first_error)
    }

    /// Completes a value of type `field_type`.
    ///
    /// Errors are caught at nullable positions: they are recorded and the value is nulled. Non
    /// null positions return them to the enclosing position.
    fn complete_value<A: Accumulator>(
        &mut self,
        field_type: &'a FieldType,
        fields: &[&'a Field],
        value: &'a FieldValue,
        position: Position,
        info: &FieldInfo<'a>,
        accumulator: &mut A,
    ) -> Result<A::PartialResult, ExecutionError> {
        if let FieldType::NonNull(inner_type) = field_type {
            return match value {
                FieldValue::Missing => Err(ExecutionError::MissingValue {
                    path: position.path,
                }),
                FieldValue::Null => Err(ExecutionError::NullValue {
                    path: position.path,
                }),
                _ => self.complete_non_null(inner_type, fields, value, position, info, accumulator),
            };
        }

        match value {
            FieldValue::Missing => {
                if self.missing_nullable_fields == MissingFieldPolicy::Error {
                    self.errors.push(ExecutionError::MissingValue {
                        path: position.path,
                    });
                }
                Ok(accumulator.accept_missing(info))
            }
            FieldValue::Null => Ok(accumulator.accept_null(info)),
            _ => match self.complete_non_null(field_type, fields, value, position, info, accumulator)
            {
                Ok(partial) => Ok(partial),
                Err(error) => {
                    self.errors.push(error);
                    Ok(accumulator.accept_missing(info))
                }
            },
        }
    }

    fn complete_non_null<A: Accumulator>(
        &mut self,
        field_type: &'a FieldType,
        fields: &[&'a Field],
        value: &'a FieldValue,
        position: Position,
        info: &FieldInfo<'a>,
        accumulator: &mut A,
    ) -> Result<A::PartialResult, ExecutionError> {
        let could_not_convert = |path: Path| ExecutionError::CouldNotConvert {
            path,
            value: value.to_json(),
            expected_type: field_type.to_string(),
        };

        match (field_type, value) {
            (FieldType::NonNull(inner_type), _) => {
                self.complete_value(inner_type, fields, value, position, info, accumulator)
            }
            (FieldType::List(inner_type), FieldValue::List(values)) => {
                let mut list = Vec::with_capacity(values.len());
                for (index, element) in values.iter().enumerate() {
                    let element_position = Position {
                        path: position.path.with_index(index),
                        cache_path: position.cache_path.index(index),
                    };
                    list.push(self.complete_value(
                        inner_type,
                        fields,
                        element,
                        element_position,
                        info,
                        accumulator,
                    )?);
                }
                Ok(accumulator.accept_list(list, info))
            }
            (FieldType::List(_), _) => Err(could_not_convert(position.path)),

            (FieldType::String, FieldValue::Scalar(Scalar::String(_)))
            | (FieldType::Float, FieldValue::Scalar(Scalar::Float(_) | Scalar::Int(_)))
            | (FieldType::Boolean, FieldValue::Scalar(Scalar::Boolean(_)))
            | (FieldType::Id, FieldValue::Scalar(Scalar::String(_) | Scalar::Int(_))) => {
                Ok(accumulator.accept_scalar(value, info))
            }
            (FieldType::Int, FieldValue::Scalar(Scalar::Int(i))) if i32::try_from(*i).is_ok() => {
                Ok(accumulator.accept_scalar(value, info))
            }
            (
                FieldType::String | FieldType::Int | FieldType::Float | FieldType::Boolean | FieldType::Id,
                _,
            ) => Err(could_not_convert(position.path)),

            (FieldType::Named(type_name), _) => {
                if fields.iter().any(|field| field.selection_set.is_some()) {
                    let object = self.complete_object(fields, value, &position)?;
                    let child = self.execute_child(object, fields, &position, accumulator)?;
                    Ok(accumulator.accept_child_object(child, info))
                } else if self.schema.is_enum(type_name) {
                    match value {
                        FieldValue::Scalar(Scalar::String(raw)) => {
                            if !self.schema.enum_contains(type_name, raw) {
                                tracing::trace!(
                                    "unknown value {raw} for enum {type_name} at {}",
                                    position.path
                                );
                            }
                            Ok(accumulator.accept_scalar(value, info))
                        }
                        _ => Err(could_not_convert(position.path)),
                    }
                } else {
                    // we cannot know about the expected format of custom scalars
                    Ok(accumulator.accept_scalar(value, info))
                }
            }
        }
    }

    /// Dereferences the value of a composite field.
    fn complete_object(
        &self,
        fields: &[&'a Field],
        value: &'a FieldValue,
        position: &Position,
    ) -> Result<ObjectRef<'a>, ExecutionError> {
        match value {
            FieldValue::Reference(key) => match self.source.resolve(key) {
                Some(object) => Ok(object),
                None => {
                    failfast_debug!("dangling reference to {key} at {}", position.path);
                    Err(ExecutionError::MissingValue {
                        path: position.path.clone(),
                    })
                }
            },
            FieldValue::Object(object_fields) => Ok(ObjectRef {
                key: None,
                fields: object_fields,
            }),
            other => Err(ExecutionError::CouldNotConvert {
                path: position.path.clone(),
                value: other.to_json(),
                expected_type: fields
                    .first()
                    .map(|field| field.field_type.to_string())
                    .unwrap_or_default(),
            }),
        }
    }

    fn execute_child<A: Accumulator>(
        &mut self,
        object: ObjectRef<'a>,
        fields: &[&'a Field],
        position: &Position,
        accumulator: &mut A,
    ) -> Result<A::ObjectResult, ExecutionError> {
        let Some(declared_type) = fields
            .iter()
            .find_map(|field| field.selection_set.as_ref())
            .map(|selection_set| selection_set.parent_type.as_str())
        else {
            return Err(ExecutionError::MissingValue {
                path: position.path.clone(),
            });
        };
        let runtime_type = self.runtime_type(object, declared_type);
        let record_key = match object.key {
            Some(key) => key.clone(),
            None => self.identify(object, runtime_type, position)?,
        };

        let mut groups = FieldGroups::new();
        for selection_set in fields.iter().filter_map(|field| field.selection_set.as_ref()) {
            self.collect_fields(
                &selection_set.selections,
                declared_type,
                runtime_type,
                &mut groups,
            );
        }

        let info = ObjectInfo {
            record_key,
            typename: runtime_type,
            path: position.path.clone(),
        };
        self.execute_object(object, groups, &info, accumulator)
    }

    /// The record key of an object read from a response: its identity when it has one, else
    /// its path.
    fn identify(
        &self,
        object: ObjectRef<'a>,
        runtime_type: Option<&str>,
        position: &Position,
    ) -> Result<RecordKey, ExecutionError> {
        let (Some(cache_keys), Some(typename)) = (self.cache_keys, runtime_type) else {
            return Ok(position.cache_path.clone());
        };
        if !cache_keys.has_resolver(typename) {
            return Ok(position.cache_path.clone());
        }
        let json: Object = object
            .fields
            .iter()
            .map(|(key, value)| (key.as_str().into(), value.to_json()))
            .collect();
        match cache_keys.resolve(typename, &json) {
            Some(info) if info.id.is_empty() => {
                tracing::debug!("empty cache key for {typename} at {}", position.path);
                Err(ExecutionError::MissingValue {
                    path: position.path.clone(),
                })
            }
            Some(info) => Ok(info.record_key(typename)),
            None => Ok(position.cache_path.clone()),
        }
    }
}

#[cfg(test)]
mod tests;
