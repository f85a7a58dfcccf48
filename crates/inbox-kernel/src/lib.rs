//! Transactional account storage with a per-account capability inbox:
//! publish, unpublish, and claim, each committed atomically with its event.

pub mod account;
pub mod config;
pub mod error;
pub mod event;
pub mod inbox;
pub mod journal;
mod registry;
pub mod runtime;
pub mod tx;

pub use account::AuthAccount;
pub use config::{DEFAULT_MAX_LINK_DEPTH, RuntimeConfig};
pub use error::{ConditionPhase, KernelError};
pub use event::{EVENT_NAMESPACE, InboxEvent};
pub use inbox::AccountInbox;
pub use journal::fs::FsJournal;
pub use journal::mem::MemJournal;
pub use journal::{CommitRecord, EventRecord, Journal, JournalError, JournalRecord, LedgerWrite, TxSeq};
pub use registry::PublishedEntry;
pub use runtime::{Runtime, Transaction, TxReceipt};
pub use tx::TxContext;
