//! Per-account keyed storage: the ledger abstraction, write batches, and
//! filesystem plus in-memory backends.

pub mod codec;
mod fs_ledger;
mod mem_ledger;

pub use fs_ledger::FsLedger;
pub use mem_ledger::MemLedger;

use inbox_types::{Address, Path, PathDomain};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, io, path::PathBuf};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage areas within one account. `Inbox` is reserved for the inbox
/// protocol and has no path syntax, so user paths can never address it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageDomain {
    Storage,
    Public,
    Private,
    Inbox,
}

impl StorageDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageDomain::Storage => "storage",
            StorageDomain::Public => "public",
            StorageDomain::Private => "private",
            StorageDomain::Inbox => "inbox",
        }
    }
}

impl From<PathDomain> for StorageDomain {
    fn from(domain: PathDomain) -> Self {
        match domain {
            PathDomain::Storage => StorageDomain::Storage,
            PathDomain::Public => StorageDomain::Public,
            PathDomain::Private => StorageDomain::Private,
        }
    }
}

/// Fully qualified location of one record: account, domain, and key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    pub owner: Address,
    pub domain: StorageDomain,
    pub key: String,
}

impl StorageKey {
    pub fn new(owner: Address, domain: StorageDomain, key: impl Into<String>) -> Self {
        Self {
            owner,
            domain,
            key: key.into(),
        }
    }

    pub fn for_path(owner: Address, path: &Path) -> Self {
        Self::new(owner, path.domain.into(), path.identifier.clone())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.domain.as_str(), self.key)
    }
}

/// Backing store for account storage shared by every transaction.
///
/// `apply` receives the whole write set of one committed transaction.
pub trait Ledger: Send + Sync {
    fn get(&self, key: &StorageKey) -> StoreResult<Option<Vec<u8>>>;
    fn apply(&self, batch: WriteBatch) -> StoreResult<()>;
}

/// Ordered set of pending writes; `None` marks a removal. Later writes to
/// the same key replace earlier ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    writes: BTreeMap<StorageKey, Option<Vec<u8>>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: StorageKey, bytes: Vec<u8>) {
        self.writes.insert(key, Some(bytes));
    }

    pub fn remove(&mut self, key: StorageKey) {
        self.writes.insert(key, None);
    }

    /// `Some(None)` means the key was removed in this batch; `None` means the
    /// batch does not touch it.
    pub fn get(&self, key: &StorageKey) -> Option<Option<&[u8]>> {
        self.writes.get(key).map(|value| value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StorageKey, Option<&[u8]>)> {
        self.writes.iter().map(|(key, value)| (key, value.as_deref()))
    }
}

impl IntoIterator for WriteBatch {
    type Item = (StorageKey, Option<Vec<u8>>);
    type IntoIter = std::collections::btree_map::IntoIter<StorageKey, Option<Vec<u8>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CBOR serialization error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub(crate) fn io_error(path: impl Into<PathBuf>, err: io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source: err,
    }
}
