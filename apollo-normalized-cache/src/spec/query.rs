//! Query processing.
//!
//! Parsing of executable documents into selection-set descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::ast;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::cache::MUTATION_ROOT;
use crate::cache::QUERY_ROOT;
use crate::cache::SUBSCRIPTION_ROOT;
use crate::json_ext::Object;
use crate::spec::FieldType;
use crate::spec::Fragment;
use crate::spec::InputValue;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::SelectionSet;
use crate::spec::SpecError;
use crate::spec::selection::FragmentLowering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// The key of the record holding the root fields of this kind of operation.
    pub fn root_key(&self) -> &'static str {
        match self {
            OperationKind::Query => QUERY_ROOT,
            OperationKind::Mutation => MUTATION_ROOT,
            OperationKind::Subscription => SUBSCRIPTION_ROOT,
        }
    }

    pub(crate) fn default_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

impl From<ast::OperationType> for OperationKind {
    fn from(operation_type: ast::OperationType) -> Self {
        match operation_type {
            ast::OperationType::Query => OperationKind::Query,
            ast::OperationType::Mutation => OperationKind::Mutation,
            ast::OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// A declared operation variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub field_type: FieldType,
    pub default_value: Option<InputValue>,
}

/// An operation: its kind, its root selection set and its variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub selection_set: SelectionSet,
    pub variables: IndexMap<String, Variable>,
}

impl Operation {
    pub fn new(kind: OperationKind, selections: Vec<Selection>) -> Self {
        Self {
            name: None,
            kind,
            selection_set: SelectionSet::new(kind.default_type_name(), selections),
            variables: IndexMap::new(),
        }
    }

    pub fn query(selections: Vec<Selection>) -> Self {
        Self::new(OperationKind::Query, selections)
    }

    /// Adds the default values of declared variables to `variables`.
    ///
    /// Values provided by the caller take precedence.
    pub fn variables_with_defaults(&self, variables: &Object) -> Object {
        if self.variables.is_empty() {
            return variables.clone();
        }
        let mut all_variables: Object = self
            .variables
            .iter()
            .filter_map(|(name, variable)| {
                let default = variable.default_value.as_ref()?.evaluate(&Object::new())?;
                Some((name.as_str().into(), default))
            })
            .collect();
        all_variables.extend(
            variables
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        all_variables
    }

    pub fn root_key(&self) -> &'static str {
        self.kind.root_key()
    }
}

/// A parsed executable document.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub operations: Vec<Operation>,
    pub fragments: HashMap<String, Arc<Fragment>>,
}

impl Query {
    /// Parses and validates `query` against `schema`, and lowers it to selection sets.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn parse(query: &str, schema: &Schema) -> Result<Self, SpecError> {
        let definitions = schema.definitions().ok_or(SpecError::MissingDefinitions)?;
        let document = ExecutableDocument::parse_and_validate(definitions, query, "query.graphql")
            .map_err(|invalid| SpecError::ValidationError(invalid.errors.to_string()))?;

        let mut fragments = FragmentLowering::new(&document);
        // lower every definition, even unused ones, so they can be looked up by name
        for name in document.fragments.keys() {
            fragments.lower(name.as_str(), 0)?;
        }

        let operations = document
            .operations
            .iter()
            .map(|operation| {
                let kind = OperationKind::from(operation.operation_type);
                let parent_type = operation.selection_set.ty.as_str();
                let selections = operation
                    .selection_set
                    .selections
                    .iter()
                    .filter_map(|selection| {
                        Selection::from_executable(selection, parent_type, &mut fragments, 0)
                            .transpose()
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Operation {
                    name: operation.name.as_ref().map(|name| name.to_string()),
                    kind,
                    selection_set: SelectionSet::new(parent_type, selections),
                    variables: operation
                        .variables
                        .iter()
                        .map(|variable| {
                            (
                                variable.name.to_string(),
                                Variable {
                                    field_type: FieldType::from(&*variable.ty),
                                    default_value: variable
                                        .default_value
                                        .as_ref()
                                        .map(|value| InputValue::from(&**value)),
                                },
                            )
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, SpecError>>()?;

        tracing::trace!(
            operations = operations.len(),
            fragments = document.fragments.len(),
            "parsed query"
        );

        Ok(Query {
            operations,
            fragments: fragments.into_fragments(),
        })
    }

    /// Returns the operation named `name`, or the only operation of the document when `name` is
    /// `None`.
    pub fn operation(&self, name: Option<&str>) -> Result<&Operation, SpecError> {
        match name {
            Some(name) => self
                .operations
                .iter()
                .find(|operation| operation.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string())),
            None if self.operations.len() == 1 => self
                .operations
                .first()
                .ok_or_else(|| SpecError::UnknownOperation(String::new())),
            None => Err(SpecError::UnknownOperation(String::new())),
        }
    }

    pub fn fragment(&self, name: &str) -> Option<&Arc<Fragment>> {
        self.fragments.get(name)
    }
}
