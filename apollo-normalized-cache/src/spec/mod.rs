//! Selection-set descriptors and the schema type table they are executed against.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod arguments;
mod enums;
mod field_type;
mod query;
mod schema;
mod selection;

use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub use self::arguments::InputValue;
pub use self::arguments::field_cache_key;
pub use self::enums::GraphQLEnum;
pub use self::field_type::FieldType;
pub use self::query::Operation;
pub use self::query::OperationKind;
pub use self::query::Query;
pub use self::query::Variable;
pub use self::schema::Schema;
pub use self::selection::Condition;
pub use self::selection::Conditional;
pub use self::selection::Field;
pub use self::selection::Fragment;
pub use self::selection::IncludeSkip;
pub use self::selection::InlineFragment;
pub use self::selection::Selection;
pub use self::selection::SelectionSet;
use crate::graphql::ErrorExtension;
use crate::json_ext::Object;

pub(crate) const TYPENAME: &str = "__typename";

/// GraphQL parsing errors.
#[derive(Error, Debug, Display, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpecError {
    /// selection processing recursion limit exceeded
    RecursionLimitExceeded,
    /// invalid type error, expected another type than '{0}'
    InvalidType(String),
    /// parsing error: {0}
    ParsingError(String),
    /// validation error: {0}
    ValidationError(String),
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// Unknown fragment named "{0}"
    UnknownFragment(String),
    /// the schema was built without SDL definitions and cannot validate documents
    MissingDefinitions,
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::RecursionLimitExceeded => "RECURSION_LIMIT_EXCEEDED",
            SpecError::InvalidType(_) => "INVALID_TYPE",
            SpecError::ParsingError(_) => "PARSING_ERROR",
            SpecError::ValidationError(_) => "GRAPHQL_VALIDATION_FAILED",
            SpecError::UnknownOperation(_) => "GRAPHQL_VALIDATION_FAILED",
            SpecError::UnknownFragment(_) => "GRAPHQL_VALIDATION_FAILED",
            SpecError::MissingDefinitions => "GRAPHQL_VALIDATION_FAILED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            SpecError::InvalidType(ty) => {
                obj.insert("type", ty.clone().into());
            }
            SpecError::UnknownOperation(name) | SpecError::UnknownFragment(name) => {
                obj.insert("name", name.clone().into());
            }
            _ => (),
        }

        (!obj.is_empty()).then_some(obj)
    }
}
