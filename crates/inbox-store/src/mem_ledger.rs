use crate::{Ledger, StorageKey, StoreResult, WriteBatch};
use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

/// In-memory ledger. Clones share the same underlying map so tests can keep
/// a handle and inspect committed state.
#[derive(Clone, Default)]
pub struct MemLedger {
    records: Arc<RwLock<BTreeMap<StorageKey, Vec<u8>>>>,
}

impl std::fmt::Debug for MemLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemLedger")
            .field("records", &self.records.read().unwrap().len())
            .finish()
    }
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.records.read().unwrap().contains_key(key)
    }
}

impl Ledger for MemLedger {
    fn get(&self, key: &StorageKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut guard = self.records.write().unwrap();
        for (key, value) in batch {
            match value {
                Some(bytes) => {
                    guard.insert(key, bytes);
                }
                None => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }
}
