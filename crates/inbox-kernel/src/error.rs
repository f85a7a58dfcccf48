use std::fmt;

use inbox_types::{Address, ForceCastError, Path, StaticType};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionPhase {
    Pre,
    Post,
}

impl fmt::Display for ConditionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionPhase::Pre => f.write_str("pre-condition"),
            ConditionPhase::Post => f.write_str("post-condition"),
        }
    }
}

/// Every failure aborts the enclosing transaction; nothing is retried.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    ForceCast(#[from] ForceCastError),
    #[error("store error: {0}")]
    Store(#[from] inbox_store::StoreError),
    #[error("journal error: {0}")]
    Journal(String),
    #[error("transaction {tx_seq} is committed but its writes are not applied to the ledger: {source}")]
    Unapplied {
        tx_seq: u64,
        #[source]
        source: inbox_store::StoreError,
    },
    #[error("account {0} did not sign this transaction")]
    NotSigner(Address),
    #[error("failed to save object: path {path} in account {address} already stores an object")]
    StorageOccupied { address: Address, path: Path },
    #[error("cannot store objects at {0}: only storage paths hold objects")]
    NotStoragePath(Path),
    #[error("cannot link at {0}: links live under public or private paths")]
    NotLinkPath(Path),
    #[error("type `{0}` is not a reference type")]
    NotReferenceType(StaticType),
    #[error("cyclic link at {address}{path}")]
    CyclicLink { address: Address, path: Path },
    #[error("link chain from {address}{path} exceeds {limit} hops")]
    LinkDepthExceeded {
        address: Address,
        path: Path,
        limit: usize,
    },
    #[error("{phase} failed: {message}")]
    Condition {
        phase: ConditionPhase,
        message: String,
    },
}

impl From<crate::journal::JournalError> for KernelError {
    fn from(err: crate::journal::JournalError) -> Self {
        KernelError::Journal(err.to_string())
    }
}
