use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};

/// The persistence layer of the index and the statistics.
///
/// Keys are compared byte-wise; [KeyValueStore::scan_prefix] returns entries in key order.
pub trait KeyValueStore: Debug + Send + Sync {
    /// Returns the value stored for `key`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stores `value` for `key`, replacing an existing value.
    fn put(&self, key: &[u8], value: &[u8]);

    /// Returns true if a value is stored for `key`.
    fn exists(&self, key: &[u8]) -> bool;

    /// Returns all entries whose key starts with `prefix` in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// A [KeyValueStore] that keeps everything in an ordered in-memory map.
#[derive(Debug, Default)]
pub struct MemKeyValueStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemKeyValueStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &[u8], value: &[u8]) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_vec(), value.to_vec());
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
