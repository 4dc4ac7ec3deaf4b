//! Cache and execution errors.
use displaydoc::Display;
use serde::Serialize;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::MalformedResponseError;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::spec::SpecError;

/// Errors raised while executing a selection set against a data source.
///
/// Every error carries the path, from the root of the execution, of the field that failed.
#[derive(Error, Display, Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ExecutionError {
    /// missing value at '{path}'
    MissingValue {
        /// Path of the field with no value.
        path: Path,
    },

    /// unexpected null value at '{path}'
    NullValue {
        /// Path of the non null field holding null.
        path: Path,
    },

    /// could not convert value at '{path}' to {expected_type}
    CouldNotConvert {
        /// Path of the field.
        path: Path,
        /// The value as read.
        value: Value,
        /// The declared type of the field.
        expected_type: String,
    },
}

impl ExecutionError {
    pub fn path(&self) -> &Path {
        match self {
            ExecutionError::MissingValue { path }
            | ExecutionError::NullValue { path }
            | ExecutionError::CouldNotConvert { path, .. } => path,
        }
    }

    /// Converts the error into a GraphQL error located at its path.
    pub fn to_graphql_error(&self) -> Error {
        let mut extensions = self.custom_extension_details().unwrap_or_default();
        extensions.insert("code", self.extension_code().into());
        Error {
            message: self.to_string(),
            locations: Vec::new(),
            path: Some(self.path().clone()),
            extensions,
        }
    }
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::MissingValue { .. } => "MISSING_VALUE",
            ExecutionError::NullValue { .. } => "NULL_VALUE",
            ExecutionError::CouldNotConvert { .. } => "COULD_NOT_CONVERT",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<crate::json_ext::Object> {
        match self {
            ExecutionError::CouldNotConvert {
                value,
                expected_type,
                ..
            } => {
                let mut details = crate::json_ext::Object::new();
                details.insert("value", value.clone());
                details.insert("expectedType", expected_type.clone().into());
                Some(details)
            }
            _ => None,
        }
    }
}

/// The execution errors of one read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionErrors(pub Vec<ExecutionError>);

impl std::ops::Deref for ExecutionErrors {
    type Target = [ExecutionError];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ExecutionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl From<Vec<ExecutionError>> for ExecutionErrors {
    fn from(errors: Vec<ExecutionError>) -> Self {
        ExecutionErrors(errors)
    }
}

/// Errors of the normalized cache.
#[derive(Error, Display, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CacheError {
    /// cache miss: {0}
    Miss(ExecutionErrors),

    /// {0}
    MalformedResponse(#[from] MalformedResponseError),

    /// invalid record '{key}': {reason}
    InvalidRecord {
        /// Key of the record, empty when the whole set is invalid.
        key: String,
        /// Why it could not be decoded.
        reason: String,
    },

    /// {0}
    Spec(#[from] SpecError),
}

impl CacheError {
    /// The execution errors of a cache miss.
    pub fn execution_errors(&self) -> &[ExecutionError] {
        match self {
            CacheError::Miss(errors) => errors,
            _ => &[],
        }
    }
}

impl ErrorExtension for CacheError {
    fn extension_code(&self) -> String {
        match self {
            CacheError::Miss(_) => "CACHE_MISS".to_string(),
            CacheError::MalformedResponse(_) => "MALFORMED_RESPONSE".to_string(),
            CacheError::InvalidRecord { .. } => "INVALID_RECORD".to_string(),
            CacheError::Spec(err) => err.extension_code(),
        }
    }
}

impl From<&CacheError> for Error {
    fn from(err: &CacheError) -> Self {
        Error::builder()
            .message(err.to_string())
            .extension_code(err.extension_code())
            .build()
    }
}
