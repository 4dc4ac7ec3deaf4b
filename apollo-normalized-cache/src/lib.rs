//! A normalized cache for GraphQL clients.
//!
//! Network responses are split into flat records keyed by object identity, and operations are
//! read back by executing their selection set against those records.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![warn(unreachable_pub)]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

#[macro_use]
pub mod json_ext;

pub mod cache;
pub mod configuration;
pub mod error;
pub mod execution;
pub mod graphql;
mod normalized_cache;
pub mod spec;

pub use cache::RecordKey;
pub use cache::RecordSet;
pub use configuration::Configuration;
pub use normalized_cache::GraphQLResult;
pub use normalized_cache::NormalizedCache;
pub use normalized_cache::QueryWatcher;
pub use normalized_cache::Source;
pub use spec::Query;
pub use spec::Schema;
