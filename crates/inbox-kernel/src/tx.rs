//! Scoped transaction context.
//!
//! Every storage write and emitted event lands in this context first. The
//! runtime applies them to the ledger and journal together once the whole
//! transaction body succeeds; on any error the context is dropped and
//! nothing leaks. A failed force-cast also marks the context as aborted, so
//! the transaction cannot commit even if the body recovers from the error.

use std::collections::BTreeSet;
use std::fmt;

use inbox_store::codec::{from_cbor, to_canonical_cbor};
use inbox_store::{Ledger, StorageDomain, StorageKey, StoreError, WriteBatch};
use inbox_types::{Address, CapabilityValue, ForceCastError, Path, PathDomain, StaticType, Value};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::account::AuthAccount;
use crate::config::RuntimeConfig;
use crate::error::KernelError;
use crate::event::InboxEvent;
use crate::inbox::AccountInbox;

/// Record shape for user-addressable storage paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub(crate) enum StoredRecord {
    Object { value: Value },
    Link { target: Path, borrow_type: StaticType },
}

pub struct TxContext<'l> {
    ledger: &'l dyn Ledger,
    config: &'l RuntimeConfig,
    signers: Vec<Address>,
    writes: WriteBatch,
    events: Vec<InboxEvent>,
    logs: Vec<String>,
    aborted: Option<ForceCastError>,
}

impl fmt::Debug for TxContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext")
            .field("signers", &self.signers)
            .field("writes", &self.writes.len())
            .field("events", &self.events)
            .field("logs", &self.logs.len())
            .field("aborted", &self.aborted.is_some())
            .finish()
    }
}

impl<'l> TxContext<'l> {
    pub(crate) fn new(ledger: &'l dyn Ledger, config: &'l RuntimeConfig, signers: Vec<Address>) -> Self {
        Self {
            ledger,
            config,
            signers,
            writes: WriteBatch::new(),
            events: Vec::new(),
            logs: Vec::new(),
            aborted: None,
        }
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn is_signer(&self, address: Address) -> bool {
        self.signers.contains(&address)
    }

    /// The `log` builtin: buffered into the receipt on commit.
    pub fn log(&mut self, message: impl fmt::Display) {
        self.logs.push(message.to_string());
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Events emitted so far; they are discarded if the transaction fails.
    pub fn events(&self) -> &[InboxEvent] {
        &self.events
    }

    /// Storage access for a signing account.
    pub fn account(&mut self, address: Address) -> Result<AuthAccount<'_, 'l>, KernelError> {
        self.require_signer(address)?;
        Ok(AuthAccount::new(self, address))
    }

    /// The inbox of a signing account.
    pub fn inbox(&mut self, address: Address) -> Result<AccountInbox<'_, 'l>, KernelError> {
        self.require_signer(address)?;
        Ok(AccountInbox::new(self, address))
    }

    /// Dereference a capability: follow links to a storage path and return the
    /// stored value if it conforms to the capability's referenced type.
    /// Untyped capabilities, dangling links, and type mismatches yield `None`.
    pub fn borrow_capability(&self, capability: &CapabilityValue) -> Result<Option<Value>, KernelError> {
        let Some(borrow_type) = capability.borrow_type.as_ref() else {
            return Ok(None);
        };
        let referenced = borrow_type
            .referenced_type()
            .ok_or_else(|| KernelError::NotReferenceType(borrow_type.clone()))?;
        let Some(target) = self.resolve_link(capability.address, &capability.path)? else {
            return Ok(None);
        };
        match self.read_stored(&StorageKey::for_path(capability.address, &target))? {
            Some(StoredRecord::Object { value }) if value.conforms_to(referenced) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    fn resolve_link(&self, address: Address, start: &Path) -> Result<Option<Path>, KernelError> {
        let mut visited = BTreeSet::new();
        let mut path = start.clone();
        for _ in 0..=self.config.max_link_depth {
            if path.domain == PathDomain::Storage {
                return Ok(Some(path));
            }
            if !visited.insert(path.clone()) {
                return Err(KernelError::CyclicLink { address, path });
            }
            match self.read_stored(&StorageKey::for_path(address, &path))? {
                Some(StoredRecord::Link { target, .. }) => path = target,
                _ => return Ok(None),
            }
        }
        Err(KernelError::LinkDepthExceeded {
            address,
            path: start.clone(),
            limit: self.config.max_link_depth,
        })
    }

    fn require_signer(&self, address: Address) -> Result<(), KernelError> {
        if self.is_signer(address) {
            Ok(())
        } else {
            Err(KernelError::NotSigner(address))
        }
    }

    /// The first failed force-cast of this transaction, if any.
    pub fn aborted(&self) -> Option<&ForceCastError> {
        self.aborted.as_ref()
    }

    /// Passes a force-cast result through, remembering the first failure.
    pub(crate) fn check_cast<T>(&mut self, cast: Result<T, ForceCastError>) -> Result<T, KernelError> {
        cast.map_err(|err| {
            self.aborted.get_or_insert_with(|| err.clone());
            KernelError::ForceCast(err)
        })
    }

    pub(crate) fn emit(&mut self, event: InboxEvent) {
        log::debug!("emit {event}");
        self.events.push(event);
    }

    /// Read through the overlay, falling back to committed state.
    pub(crate) fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, KernelError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.map(<[u8]>::to_vec)),
            None => Ok(self.ledger.get(key)?),
        }
    }

    pub(crate) fn read_record<T: DeserializeOwned>(&self, key: &StorageKey) -> Result<Option<T>, KernelError> {
        let Some(bytes) = self.read(key)? else {
            return Ok(None);
        };
        let record = from_cbor(&bytes).map_err(|err| StoreError::Corrupt {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Some(record))
    }

    pub(crate) fn write_record<T: Serialize>(&mut self, key: StorageKey, record: &T) -> Result<(), KernelError> {
        let bytes = to_canonical_cbor(record).map_err(StoreError::from)?;
        self.writes.set(key, bytes);
        Ok(())
    }

    pub(crate) fn delete(&mut self, key: StorageKey) {
        self.writes.remove(key);
    }

    pub(crate) fn read_stored(&self, key: &StorageKey) -> Result<Option<StoredRecord>, KernelError> {
        debug_assert_ne!(key.domain, StorageDomain::Inbox);
        self.read_record(key)
    }

    pub(crate) fn into_parts(self) -> (WriteBatch, Vec<InboxEvent>, Vec<String>) {
        (self.writes, self.events, self.logs)
    }
}
