use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// A GraphQL enum value read from a result.
///
/// Servers may add enum values before clients know about them, so a value that does not map to
/// a known case is kept as [`GraphQLEnum::Unknown`] with its raw text instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphQLEnum<T> {
    Case(T),
    Unknown(String),
}

impl<T> GraphQLEnum<T>
where
    T: FromStr,
{
    pub fn from_raw(raw: &str) -> Self {
        match raw.parse::<T>() {
            Ok(case) => GraphQLEnum::Case(case),
            Err(_) => GraphQLEnum::Unknown(raw.to_string()),
        }
    }
}

impl<T> GraphQLEnum<T> {
    pub fn case(&self) -> Option<&T> {
        match self {
            GraphQLEnum::Case(case) => Some(case),
            GraphQLEnum::Unknown(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for GraphQLEnum<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphQLEnum::Case(case) => case.fmt(f),
            GraphQLEnum::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl<T: fmt::Display> Serialize for GraphQLEnum<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: FromStr> Deserialize<'de> for GraphQLEnum<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(GraphQLEnum::from_raw(&raw))
    }
}
