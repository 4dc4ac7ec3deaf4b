//! The normalized cache: network responses in, cached results out.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::cache::CacheKeyResolver;
use crate::cache::ChangeSet;
use crate::cache::ChangedKeys;
use crate::cache::RecordKey;
use crate::cache::RecordSet;
use crate::cache::RecordStore;
use crate::cache::Resolvable;
use crate::configuration::Configuration;
use crate::configuration::Execution;
use crate::error::CacheError;
use crate::error::ExecutionError;
use crate::execution::DependencyTracker;
use crate::execution::Executor;
use crate::execution::NormalizingAccumulator;
use crate::execution::ResponseSource;
use crate::execution::ResultAccumulator;
use crate::execution::Zip;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::Operation;
use crate::spec::Schema;

/// Where a result comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Server,
    Cache,
}

/// The result of an operation, as written from the network or read from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLResult {
    /// The data, `None` when an error reached the root.
    pub data: Option<Value>,
    /// The `errors` array of the network response.
    pub errors: Vec<graphql::Error>,
    /// The errors found while executing the selection set.
    pub execution_errors: Vec<ExecutionError>,
    pub extensions: Object,
    pub source: Source,
    /// The record fields the result was built from.
    pub dependent_keys: BTreeSet<String>,
}

impl GraphQLResult {
    /// Converts the result to a response, execution errors following the network ones.
    pub fn into_response(self) -> graphql::Response {
        let errors = self
            .errors
            .into_iter()
            .chain(
                self.execution_errors
                    .iter()
                    .map(ExecutionError::to_graphql_error),
            )
            .collect();
        graphql::Response {
            data: self.data,
            errors,
            extensions: self.extensions,
        }
    }
}

/// A normalized GraphQL cache.
///
/// Responses are split into records keyed by object identity, so that every operation reading
/// an object sees the latest value written by any other. Cloning is cheap and clones share
/// their records.
#[derive(Debug, Clone)]
pub struct NormalizedCache {
    store: Arc<RecordStore>,
    schema: Arc<Schema>,
    cache_keys: Arc<CacheKeyResolver>,
    options: Execution,
}

#[buildstructor::buildstructor]
impl NormalizedCache {
    #[builder]
    pub fn new(
        schema: Schema,
        cache_keys: Option<CacheKeyResolver>,
        options: Option<Execution>,
        records: Option<RecordSet>,
        notification_capacity: Option<usize>,
    ) -> Self {
        let notification_capacity =
            notification_capacity.unwrap_or(crate::cache::DEFAULT_NOTIFICATION_CAPACITY);
        Self {
            store: Arc::new(RecordStore::with_records(
                records.unwrap_or_default(),
                notification_capacity,
            )),
            schema: Arc::new(schema),
            cache_keys: Arc::new(cache_keys.unwrap_or_default()),
            options: options.unwrap_or_default(),
        }
    }

    pub fn from_configuration(schema: Schema, configuration: &Configuration) -> Self {
        Self::new(
            schema,
            Some(CacheKeyResolver::from_configuration(
                &configuration.cache.keys,
            )),
            Some(configuration.execution),
            None,
            Some(configuration.cache.notification_capacity),
        )
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Normalizes a network response into the store, and returns its result.
    ///
    /// Records are written for every subtree that executed without error, even when others
    /// failed, an error reaching the root included. The change set is published once all of
    /// them are merged.
    #[tracing::instrument(skip_all, level = "trace", fields(operation = operation.name.as_deref()))]
    pub fn write_response(
        &self,
        operation: &Operation,
        response: &graphql::Response,
        variables: &Object,
    ) -> GraphQLResult {
        let variables = operation.variables_with_defaults(variables);
        let mut result = GraphQLResult {
            data: None,
            errors: response.errors.clone(),
            execution_errors: Vec::new(),
            extensions: response.extensions.clone(),
            source: Source::Server,
            dependent_keys: BTreeSet::new(),
        };
        let Some(data) = response.data.as_ref().filter(|data| data.is_object()) else {
            tracing::debug!(
                errors = response.errors.len(),
                "response has no data to normalize"
            );
            return result;
        };

        let source = ResponseSource::new(data);
        let mut accumulator = Zip(
            ResultAccumulator,
            Zip(NormalizingAccumulator::new(), DependencyTracker::new()),
        );
        let execution = Executor::new(&source, &self.schema, &variables)
            .with_cache_keys(&self.cache_keys)
            .with_missing_nullable_fields(self.options.missing_nullable_fields)
            .execute(
                &operation.selection_set,
                &RecordKey::from(operation.root_key()),
                &mut accumulator,
            );

        let records = match execution.data {
            Some((data, (records, ()))) => {
                result.data = Some(data);
                records
            }
            None => accumulator.1.0.take_completed(),
        };
        if !records.is_empty() {
            let changed = self.store.merge_records(records);
            tracing::debug!(
                changed_keys = changed.len(),
                execution_errors = execution.errors.len(),
                "wrote response"
            );
        }
        result.execution_errors = execution.errors;
        result.dependent_keys = accumulator.1.1.into_dependent_keys();
        result
    }

    /// Parses a network response and writes it. See [`NormalizedCache::write_response`].
    pub fn write_response_bytes(
        &self,
        operation: &Operation,
        response: Bytes,
        variables: &Object,
    ) -> Result<GraphQLResult, CacheError> {
        let response = graphql::Response::from_bytes(response)?;
        Ok(self.write_response(operation, &response, variables))
    }

    /// Executes `operation` against the store.
    ///
    /// A read is all or nothing: any execution error makes it a cache miss.
    #[tracing::instrument(skip_all, level = "trace", fields(operation = operation.name.as_deref()))]
    pub fn read(
        &self,
        operation: &Operation,
        variables: &Object,
    ) -> Result<GraphQLResult, CacheError> {
        let (result, _) = self.execute_read(operation, variables);
        result
    }

    /// Returns a read that runs when the value is asked for, against the records of that time.
    pub fn read_deferred(
        &self,
        operation: Arc<Operation>,
        variables: Object,
    ) -> Resolvable<Result<GraphQLResult, CacheError>> {
        let cache = self.clone();
        Resolvable::pending(move || cache.read(&operation, &variables))
    }

    /// Merges records into the store, and returns the changed field paths.
    pub fn write_records(&self, records: RecordSet) -> ChangedKeys {
        self.store.merge_records(records)
    }

    pub fn load_records<'a>(&self, keys: impl IntoIterator<Item = &'a RecordKey>) -> RecordSet {
        self.store.load_records(keys)
    }

    /// A copy of every record, for persistence.
    pub fn snapshot(&self) -> RecordSet {
        self.store.snapshot()
    }

    pub fn clear(&self) {
        self.store.clear()
    }

    /// Subscribes to the change sets published after every write.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChangeSet>> {
        self.store.subscribe()
    }

    /// Reads `operation` and keeps watching the records it depends on.
    pub fn watch(&self, operation: Arc<Operation>, variables: Object) -> QueryWatcher {
        let changes = self.subscribe();
        let (result, dependent_keys) = self.execute_read(&operation, &variables);
        QueryWatcher {
            cache: self.clone(),
            operation,
            variables,
            changes,
            dependent_keys,
            result,
        }
    }

    fn execute_read(
        &self,
        operation: &Operation,
        variables: &Object,
    ) -> (Result<GraphQLResult, CacheError>, BTreeSet<String>) {
        let variables = operation.variables_with_defaults(variables);
        let mut accumulator = Zip(ResultAccumulator, DependencyTracker::new());
        let execution = self.store.read(|records| {
            Executor::new(records, &self.schema, &variables)
                .with_missing_nullable_fields(self.options.missing_nullable_fields)
                .execute(
                    &operation.selection_set,
                    &RecordKey::from(operation.root_key()),
                    &mut accumulator,
                )
        });
        let dependent_keys = accumulator.1.into_dependent_keys();

        let result = match execution.data {
            Some((data, ())) if execution.errors.is_empty() => {
                tracing::debug!(dependent_keys = dependent_keys.len(), "cache hit");
                Ok(GraphQLResult {
                    data: Some(data),
                    errors: Vec::new(),
                    execution_errors: Vec::new(),
                    extensions: Object::new(),
                    source: Source::Cache,
                    dependent_keys: dependent_keys.clone(),
                })
            }
            _ => {
                tracing::debug!(errors = execution.errors.len(), "cache miss");
                Err(CacheError::Miss(execution.errors.into()))
            }
        };
        (result, dependent_keys)
    }
}

/// A cached operation kept up to date with the store.
///
/// The watcher tracks the record fields its last read depended on, missing ones included, and
/// only re-reads on change sets touching them.
#[derive(Debug)]
pub struct QueryWatcher {
    cache: NormalizedCache,
    operation: Arc<Operation>,
    variables: Object,
    changes: broadcast::Receiver<Arc<ChangeSet>>,
    dependent_keys: BTreeSet<String>,
    result: Result<GraphQLResult, CacheError>,
}

impl QueryWatcher {
    /// The result of the last read.
    pub fn result(&self) -> &Result<GraphQLResult, CacheError> {
        &self.result
    }

    pub fn dependent_keys(&self) -> &BTreeSet<String> {
        &self.dependent_keys
    }

    /// Returns `true` if `change_set` may change the result.
    pub fn is_affected_by(&self, change_set: &ChangeSet) -> bool {
        change_set.intersects(&self.dependent_keys)
    }

    /// Reads the operation again and updates the dependent keys.
    pub fn refresh(&mut self) -> &Result<GraphQLResult, CacheError> {
        let (result, dependent_keys) = self.cache.execute_read(&self.operation, &self.variables);
        self.dependent_keys = dependent_keys;
        self.result = result;
        &self.result
    }

    /// Waits for a change set affecting the result, then refreshes it.
    ///
    /// Returns `None` once the cache is dropped.
    pub async fn changed(&mut self) -> Option<&Result<GraphQLResult, CacheError>> {
        loop {
            match self.changes.recv().await {
                Ok(change_set) if self.is_affected_by(&change_set) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "watcher lagged behind the store");
                    break;
                }
                Err(RecvError::Closed) => return None,
            }
        }
        Some(self.refresh())
    }
}
