//! Inbox entry registry: published entries keyed by name inside one account's
//! reserved `Inbox` storage domain.

use inbox_store::{StorageDomain, StorageKey};
use inbox_types::{Address, CapabilityValue};
use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::tx::TxContext;

/// A capability waiting in the provider's inbox. The provider is the account
/// owning the storage and the name is the storage key, so neither is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntry {
    pub value: CapabilityValue,
    pub recipient: Address,
}

/// Registry view over one account's inbox domain.
pub(crate) struct InboxRegistry<'a, 'l> {
    ctx: &'a mut TxContext<'l>,
    owner: Address,
}

impl<'a, 'l> InboxRegistry<'a, 'l> {
    pub(crate) fn new(ctx: &'a mut TxContext<'l>, owner: Address) -> Self {
        Self { ctx, owner }
    }

    fn key(&self, name: &str) -> StorageKey {
        StorageKey::new(self.owner, StorageDomain::Inbox, name)
    }

    pub(crate) fn get(&self, name: &str) -> Result<Option<PublishedEntry>, KernelError> {
        self.ctx.read_record(&self.key(name))
    }

    pub(crate) fn set(&mut self, name: &str, entry: &PublishedEntry) -> Result<(), KernelError> {
        let key = self.key(name);
        self.ctx.write_record(key, entry)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<Option<PublishedEntry>, KernelError> {
        let key = self.key(name);
        let entry = self.ctx.read_record(&key)?;
        if entry.is_some() {
            self.ctx.delete(key);
        }
        Ok(entry)
    }
}

/// Read-then-remove access to another account's inbox. Only the claim
/// operation opens one; it is the sole cross-account path into an inbox.
pub(crate) struct ProviderInbox<'a, 'l> {
    registry: InboxRegistry<'a, 'l>,
}

impl<'a, 'l> ProviderInbox<'a, 'l> {
    pub(crate) fn open(ctx: &'a mut TxContext<'l>, provider: Address) -> Self {
        Self {
            registry: InboxRegistry::new(ctx, provider),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Result<Option<PublishedEntry>, KernelError> {
        self.registry.get(name)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<Option<PublishedEntry>, KernelError> {
        self.registry.remove(name)
    }
}
