//! Logic for loading configuration in to an object model
use std::collections::BTreeMap;
use std::str::FromStr;

use displaydoc::Display;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::cache::DEFAULT_NOTIFICATION_CAPACITY;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    DeserializeYaml(#[from] serde_yaml::Error),
    /// could not deserialize configuration: {0}
    DeserializeJson(#[from] serde_json::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration of a normalized cache.
///
/// Can be created through `serde::Deserialize` from various formats, through [`FromStr`] from
/// YAML, or inline in Rust code with [`Configuration::builder`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Record storage and object identity.
    pub cache: Cache,

    /// Selection set execution.
    pub execution: Execution,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        cache: Option<Cache>,
        execution: Option<Execution>,
    ) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            cache: cache.unwrap_or_default(),
            execution: execution.unwrap_or_default(),
        };
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        let configuration: Configuration = serde_json::from_value(value)?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// The JSON schema of the configuration, for editor validation.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Configuration)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let keys = &self.cache.keys;
        for (typename, key_fields) in keys
            .types
            .iter()
            .map(|(typename, fields)| (typename.as_str(), fields))
            .chain(keys.unknown_types.iter().map(|fields| ("unknown_types", fields)))
        {
            if key_fields.fields.is_empty() {
                return Err(ConfigurationError::InvalidConfiguration {
                    message: "cache key fields cannot be empty",
                    error: format!("no key field declared for '{typename}'"),
                });
            }
        }
        if self.cache.notification_capacity == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "notification capacity must be positive",
                error: "cache.notification_capacity is 0".to_string(),
            });
        }
        Ok(())
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration = serde_yaml::from_str(s)?;
        configuration.validate()?;
        Ok(configuration)
    }
}

/// Record storage configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Cache {
    /// How objects get their identity.
    pub keys: Keys,

    /// Number of change sets buffered for a subscriber that has not read them yet.
    pub notification_capacity: usize,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            keys: Keys::default(),
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

#[buildstructor::buildstructor]
impl Cache {
    #[builder]
    pub fn new(keys: Option<Keys>, notification_capacity: Option<usize>) -> Self {
        Self {
            keys: keys.unwrap_or_default(),
            notification_capacity: notification_capacity.unwrap_or(DEFAULT_NOTIFICATION_CAPACITY),
        }
    }
}

/// Object identity configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Keys {
    /// Key fields per typename.
    pub types: BTreeMap<String, KeyFields>,

    /// Key fields of the types absent from `types`.
    pub unknown_types: Option<KeyFields>,
}

impl Keys {
    pub fn with_type(mut self, typename: impl Into<String>, fields: KeyFields) -> Self {
        self.types.insert(typename.into(), fields);
        self
    }

    pub fn with_unknown_types(mut self, fields: KeyFields) -> Self {
        self.unknown_types = Some(fields);
        self
    }
}

/// Fields making up the identity of an object. Their values are joined with `+`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct KeyFields {
    pub fields: Vec<String>,

    /// Prefix shared by the types of one identity space, instead of the typename.
    #[serde(default)]
    pub group: Option<String>,
}

impl KeyFields {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            group: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Selection set execution configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Execution {
    /// What an absent value on a nullable field becomes.
    pub missing_nullable_fields: MissingFieldPolicy,
}

/// Handling of values absent from the data source on nullable fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Record a missing value error and null the field.
    #[default]
    Error,
    /// Null the field without error.
    Null,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml() {
        let configuration = Configuration::from_str(
            r#"
cache:
  keys:
    types:
      Human: { fields: [id] }
      Droid: { fields: [id], group: Character }
    unknown_types: { fields: [id] }
  notification_capacity: 16
execution:
  missing_nullable_fields: "null"
"#,
        )
        .unwrap();
        assert_eq!(configuration.cache.notification_capacity, 16);
        assert_eq!(
            configuration.cache.keys.types["Droid"],
            KeyFields::new(["id"]).group("Character")
        );
        assert_eq!(
            configuration.cache.keys.unknown_types,
            Some(KeyFields::new(["id"]))
        );
        assert_eq!(
            configuration.execution.missing_nullable_fields,
            MissingFieldPolicy::Null
        );
    }

    #[test]
    fn defaults_apply_to_an_empty_document() {
        let configuration = Configuration::from_str("{}").unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_eq!(
            configuration.cache.notification_capacity,
            DEFAULT_NOTIFICATION_CAPACITY
        );
        assert_eq!(
            configuration.execution.missing_nullable_fields,
            MissingFieldPolicy::Error
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Configuration::from_str("cache:\n  eviction: lru\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::DeserializeYaml(_)));
    }

    #[test]
    fn empty_key_fields_are_rejected() {
        let err = Configuration::from_json(serde_json::json!({
            "cache": { "keys": { "types": { "Human": { "fields": [] } } } }
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cache key fields cannot be empty: no key field declared for 'Human'"
        );
    }

    #[test]
    fn builders_fill_defaults() {
        let configuration = Configuration::builder()
            .cache(
                Cache::builder()
                    .keys(Keys::default().with_type("Human", KeyFields::new(["id"])))
                    .build(),
            )
            .build()
            .unwrap();
        assert!(configuration.cache.keys.types.contains_key("Human"));
        assert_eq!(
            configuration.cache.notification_capacity,
            DEFAULT_NOTIFICATION_CAPACITY
        );
    }

    #[test]
    fn json_schema_describes_the_configuration() {
        let schema = serde_json::to_value(Configuration::json_schema()).unwrap();
        assert!(schema["properties"]["cache"].is_object());
        assert!(schema["definitions"]["MissingFieldPolicy"].is_object());
    }
}
