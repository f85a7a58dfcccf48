//! Inbox operations: publish, unpublish, and claim.
//!
//! Per `(provider, name)` slot: `Absent -> Published` via publish, then back
//! to `Absent` via unpublish by the provider or claim by the recipient.
//! Publishing over an occupied slot replaces the entry.

use inbox_types::{Address, CapabilityValue, StaticType};

use crate::error::KernelError;
use crate::event::InboxEvent;
use crate::registry::{InboxRegistry, ProviderInbox, PublishedEntry};
use crate::tx::TxContext;

/// Inbox of a signing account within one transaction.
pub struct AccountInbox<'a, 'l> {
    ctx: &'a mut TxContext<'l>,
    owner: Address,
}

impl<'a, 'l> AccountInbox<'a, 'l> {
    pub(crate) fn new(ctx: &'a mut TxContext<'l>, owner: Address) -> Self {
        Self { ctx, owner }
    }

    pub fn address(&self) -> Address {
        self.owner
    }

    /// Files `capability` under `name` for `recipient` to claim.
    pub fn publish(
        &mut self,
        capability: CapabilityValue,
        name: &str,
        recipient: Address,
    ) -> Result<(), KernelError> {
        let value_type = capability.static_type();
        let mut registry = InboxRegistry::new(self.ctx, self.owner);
        if let Some(previous) = registry.get(name)? {
            log::debug!(
                "inbox {}: '{name}' replaces an unclaimed entry for {}",
                self.owner,
                previous.recipient
            );
        }
        registry.set(
            name,
            &PublishedEntry {
                value: capability,
                recipient,
            },
        )?;
        self.ctx.emit(InboxEvent::ValuePublished {
            provider: self.owner,
            recipient,
            name: name.to_string(),
            value_type,
        });
        Ok(())
    }

    /// Withdraws the entry under `name` from this account's own inbox.
    ///
    /// The entry is cast before it is removed, so a type mismatch leaves it in
    /// place and aborts the transaction.
    pub fn unpublish(
        &mut self,
        name: &str,
        borrow_type: &StaticType,
    ) -> Result<Option<CapabilityValue>, KernelError> {
        let Some(entry) = InboxRegistry::new(self.ctx, self.owner).get(name)? else {
            return Ok(None);
        };
        let capability = self.ctx.check_cast(entry.value.force_cast(borrow_type))?;
        InboxRegistry::new(self.ctx, self.owner).remove(name)?;
        self.ctx.emit(InboxEvent::ValueUnpublished {
            provider: self.owner,
            name: name.to_string(),
        });
        Ok(Some(capability))
    }

    /// Takes the entry `provider` published under `name` for this account.
    ///
    /// A missing entry and an entry addressed to someone else look the same
    /// (`None`), and in both cases nothing is written.
    pub fn claim(
        &mut self,
        name: &str,
        provider: Address,
        borrow_type: &StaticType,
    ) -> Result<Option<CapabilityValue>, KernelError> {
        let Some(entry) = ProviderInbox::open(self.ctx, provider).get(name)? else {
            log::debug!("claim of '{name}' from {provider} by {}: no entry", self.owner);
            return Ok(None);
        };
        if entry.recipient != self.owner {
            log::debug!(
                "claim of '{name}' from {provider} by {}: not the recipient",
                self.owner
            );
            return Ok(None);
        }
        let capability = self.ctx.check_cast(entry.value.force_cast(borrow_type))?;
        ProviderInbox::open(self.ctx, provider).remove(name)?;
        self.ctx.emit(InboxEvent::ValueClaimed {
            provider,
            recipient: self.owner,
            name: name.to_string(),
        });
        Ok(Some(capability))
    }
}
