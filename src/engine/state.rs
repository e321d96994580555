//! In-memory archive state and its locks
//!
//! Lock order, always: namespace -> ledger map -> ledger entry -> journal.
//!
//! - The namespace table sits behind one `RwLock`. Object events hold the
//!   read side for their whole duration; bucket create/retire and the
//!   write that activates versioning take the write side.
//! - Each (bucket, key) ledger has its own `Mutex`, so events for
//!   different keys run in parallel while events for one key serialize.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{ArchiveError, ArchiveResult};
use crate::ledger::VersionLedgerEntry;
use crate::namespace::{BucketHandle, NamespaceTable};

/// Ledger address. Keyed by arena handle so retire-and-rename never moves
/// ledger data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    pub bucket: BucketHandle,
    pub key: String,
}

impl LedgerKey {
    pub fn new(bucket: BucketHandle, key: impl Into<String>) -> Self {
        Self {
            bucket,
            key: key.into(),
        }
    }
}

pub type SharedEntry = Arc<Mutex<VersionLedgerEntry>>;

#[derive(Debug, Default)]
pub struct LedgerStore {
    entries: RwLock<HashMap<LedgerKey, SharedEntry>>,
}

impl LedgerStore {
    pub fn from_entries(entries: HashMap<LedgerKey, VersionLedgerEntry>) -> Self {
        let shared = entries
            .into_iter()
            .map(|(k, v)| (k, Arc::new(Mutex::new(v))))
            .collect();
        Self {
            entries: RwLock::new(shared),
        }
    }

    /// Existing entry for `key`, if any.
    pub fn get(&self, key: &LedgerKey) -> ArchiveResult<Option<SharedEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ArchiveError::LockPoisoned("ledger map"))?;
        Ok(entries.get(key).cloned())
    }

    /// Entry for `key`, created empty when missing.
    pub fn get_or_create(&self, key: &LedgerKey) -> ArchiveResult<SharedEntry> {
        if let Some(entry) = self.get(key)? {
            return Ok(entry);
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ArchiveError::LockPoisoned("ledger map"))?;
        Ok(entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(VersionLedgerEntry::new(key.key.clone()))))
            .clone())
    }

    /// Keys of every non-empty ledger in `bucket`, sorted.
    pub fn keys_in(&self, bucket: BucketHandle) -> ArchiveResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ArchiveError::LockPoisoned("ledger map"))?;
        let mut keys = Vec::new();
        for (ledger_key, entry) in entries.iter().filter(|(k, _)| k.bucket == bucket) {
            if !lock_entry(entry)?.is_empty() {
                keys.push(ledger_key.key.clone());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

pub fn lock_entry(entry: &SharedEntry) -> ArchiveResult<MutexGuard<'_, VersionLedgerEntry>> {
    entry
        .lock()
        .map_err(|_| ArchiveError::LockPoisoned("ledger entry"))
}

#[derive(Debug, Default)]
pub struct ArchiveState {
    namespace: RwLock<NamespaceTable>,
    pub ledgers: LedgerStore,
}

impl ArchiveState {
    pub fn new(namespace: NamespaceTable, ledgers: HashMap<LedgerKey, VersionLedgerEntry>) -> Self {
        Self {
            namespace: RwLock::new(namespace),
            ledgers: LedgerStore::from_entries(ledgers),
        }
    }

    pub fn read_namespace(&self) -> ArchiveResult<RwLockReadGuard<'_, NamespaceTable>> {
        self.namespace
            .read()
            .map_err(|_| ArchiveError::LockPoisoned("namespace table"))
    }

    pub fn write_namespace(&self) -> ArchiveResult<RwLockWriteGuard<'_, NamespaceTable>> {
        self.namespace
            .write()
            .map_err(|_| ArchiveError::LockPoisoned("namespace table"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_entry() {
        let store = LedgerStore::default();
        let key = LedgerKey::new(BucketHandle(0), "foo");

        let a = store.get_or_create(&key).unwrap();
        let b = store.get_or_create(&key).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_entries_are_not_listed() {
        let store = LedgerStore::default();
        store
            .get_or_create(&LedgerKey::new(BucketHandle(0), "empty"))
            .unwrap();
        assert!(store.keys_in(BucketHandle(0)).unwrap().is_empty());
    }

    #[test]
    fn test_keys_are_scoped_to_bucket() {
        let mut entries = HashMap::new();
        let mut foo = VersionLedgerEntry::new("foo");
        foo.append(crate::ledger::ObjectVersion::new(
            crate::ledger::VersionId::from_sequence(1),
            crate::ledger::VersionKind::DeleteMarker,
            1,
            Default::default(),
        ))
        .unwrap();
        entries.insert(LedgerKey::new(BucketHandle(1), "foo"), foo);

        let store = LedgerStore::from_entries(entries);
        assert_eq!(store.keys_in(BucketHandle(1)).unwrap(), vec!["foo".to_string()]);
        assert!(store.keys_in(BucketHandle(0)).unwrap().is_empty());
    }
}
