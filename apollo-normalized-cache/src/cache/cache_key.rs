//! Object identity resolution.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::cache::RecordKey;
use crate::configuration::KeyFields;
use crate::configuration::Keys;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// The identity of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKeyInfo {
    pub id: String,
    /// Shared prefix for types living in one identity space. The typename is used when `None`.
    pub unique_key_group: Option<String>,
}

impl CacheKeyInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unique_key_group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.unique_key_group = Some(group.into());
        self
    }

    /// The record key for an object of type `typename` with this identity.
    pub fn record_key(&self, typename: &str) -> RecordKey {
        let prefix = self.unique_key_group.as_deref().unwrap_or(typename);
        RecordKey::new(format!("{prefix}:{}", self.id))
    }
}

/// Decides the identity of objects of a type.
///
/// Returning `None` opts the object out of identity: it is then stored under its path.
pub trait ResolveCacheKey: Send + Sync {
    fn resolve(&self, typename: &str, object: &Object) -> Option<CacheKeyInfo>;
}

impl<F> ResolveCacheKey for F
where
    F: Fn(&str, &Object) -> Option<CacheKeyInfo> + Send + Sync,
{
    fn resolve(&self, typename: &str, object: &Object) -> Option<CacheKeyInfo> {
        self(typename, object)
    }
}

impl ResolveCacheKey for KeyFields {
    fn resolve(&self, _typename: &str, object: &Object) -> Option<CacheKeyInfo> {
        let id = self
            .fields
            .iter()
            .map(|field| match object.get(field.as_str())? {
                Value::String(s) => Some(s.as_str().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?
            .join("+");
        Some(CacheKeyInfo {
            id,
            unique_key_group: self.group.clone(),
        })
    }
}

/// Maps typenames to the resolver deciding their identity.
#[derive(Clone, Default)]
pub struct CacheKeyResolver {
    types: HashMap<String, Arc<dyn ResolveCacheKey>>,
    unknown_type: Option<Arc<dyn ResolveCacheKey>>,
}

impl fmt::Debug for CacheKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKeyResolver")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("unknown_type", &self.unknown_type.is_some())
            .finish()
    }
}

impl CacheKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(
        mut self,
        typename: impl Into<String>,
        resolver: impl ResolveCacheKey + 'static,
    ) -> Self {
        self.types.insert(typename.into(), Arc::new(resolver));
        self
    }

    /// Sets the resolver for types with no resolver of their own.
    pub fn with_unknown_type(mut self, resolver: impl ResolveCacheKey + 'static) -> Self {
        self.unknown_type = Some(Arc::new(resolver));
        self
    }

    pub fn from_configuration(keys: &Keys) -> Self {
        let mut resolver = keys
            .types
            .iter()
            .fold(CacheKeyResolver::new(), |resolver, (typename, fields)| {
                resolver.with_type(typename.clone(), fields.clone())
            });
        if let Some(fields) = &keys.unknown_types {
            resolver = resolver.with_unknown_type(fields.clone());
        }
        resolver
    }

    fn resolver_for(&self, typename: &str) -> Option<&Arc<dyn ResolveCacheKey>> {
        self.types.get(typename).or(self.unknown_type.as_ref())
    }

    /// Returns `true` if objects of `typename` may have an identity.
    pub fn has_resolver(&self, typename: &str) -> bool {
        self.resolver_for(typename).is_some()
    }

    pub fn resolve(&self, typename: &str, object: &Object) -> Option<CacheKeyInfo> {
        self.resolver_for(typename)?.resolve(typename, object)
    }
}
