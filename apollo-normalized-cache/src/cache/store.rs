use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cache::ChangedKeys;
use crate::cache::Record;
use crate::cache::RecordKey;
use crate::cache::RecordSet;

pub(crate) const DEFAULT_NOTIFICATION_CAPACITY: usize = 128;

/// What changed in the store after a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Paths of the changed fields, as `recordKey.storageKey`.
    pub keys: ChangedKeys,
    /// Set when every record was dropped.
    pub cleared: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && !self.cleared
    }

    /// Returns `true` if the change may affect a reader that depends on `dependent_keys`.
    pub fn intersects(&self, dependent_keys: &ChangedKeys) -> bool {
        self.cleared || self.keys.iter().any(|key| dependent_keys.contains(key))
    }
}

/// The shared record set.
///
/// Reads run under a read lock and never see a partially applied write: every merge is applied
/// under the write lock as one unit, then published to subscribers.
pub struct RecordStore {
    records: RwLock<RecordSet>,
    notifier: broadcast::Sender<Arc<ChangeSet>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("records", &self.records.read().len())
            .field("subscribers", &self.notifier.receiver_count())
            .finish()
    }
}

impl RecordStore {
    /// Creates an empty store. `notification_capacity` bounds the change sets buffered for a
    /// slow subscriber before it starts lagging.
    pub fn new(notification_capacity: usize) -> Self {
        let (notifier, _) = broadcast::channel(notification_capacity.max(1));
        Self {
            records: RwLock::new(RecordSet::new()),
            notifier,
        }
    }

    pub fn with_records(records: RecordSet, notification_capacity: usize) -> Self {
        let store = Self::new(notification_capacity);
        *store.records.write() = records;
        store
    }

    /// Runs `f` against the records under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&RecordSet) -> R) -> R {
        f(&self.records.read())
    }

    /// Returns a copy of the record stored under `key`.
    pub fn load(&self, key: &str) -> Option<Record> {
        self.records.read().get(key).cloned()
    }

    /// Returns copies of the records stored under `keys`, skipping absent ones.
    pub fn load_records<'a>(&self, keys: impl IntoIterator<Item = &'a RecordKey>) -> RecordSet {
        let records = self.records.read();
        keys.into_iter()
            .filter_map(|key| records.get(key.as_str()).cloned())
            .collect()
    }

    pub fn snapshot(&self) -> RecordSet {
        self.records.read().clone()
    }

    pub fn merge(&self, record: Record) -> ChangedKeys {
        self.merge_records(std::iter::once(record).collect())
    }

    /// Merges `records` atomically and publishes the changed paths when there are some.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn merge_records(&self, records: RecordSet) -> ChangedKeys {
        let incoming = records.len();
        let changed = {
            let mut guard = self.records.write();
            guard.merge_records(records)
        };
        tracing::debug!(
            records = incoming,
            changed_keys = changed.len(),
            "merged records"
        );
        if !changed.is_empty() {
            self.publish(ChangeSet {
                keys: changed.clone(),
                cleared: false,
            });
        }
        changed
    }

    /// Drops every record.
    pub fn clear(&self) {
        self.records.write().clear();
        tracing::debug!("cleared records");
        self.publish(ChangeSet {
            keys: ChangedKeys::new(),
            cleared: true,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChangeSet>> {
        self.notifier.subscribe()
    }

    fn publish(&self, change_set: ChangeSet) {
        // an error only means there is no subscriber
        let _ = self.notifier.send(Arc::new(change_set));
    }
}
