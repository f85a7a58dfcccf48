use inbox_store::StorageKey;
use inbox_types::{Address, CapabilityValue, Path, PathDomain, StaticType, Value, force_cast};

use crate::error::KernelError;
use crate::inbox::AccountInbox;
use crate::tx::{StoredRecord, TxContext};

/// Storage and link access for a signing account.
pub struct AuthAccount<'a, 'l> {
    ctx: &'a mut TxContext<'l>,
    address: Address,
}

impl<'a, 'l> AuthAccount<'a, 'l> {
    pub(crate) fn new(ctx: &'a mut TxContext<'l>, address: Address) -> Self {
        Self { ctx, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn inbox(&mut self) -> AccountInbox<'_, 'l> {
        AccountInbox::new(self.ctx, self.address)
    }

    /// Stores `value` at a storage path. Fails if the path is occupied.
    pub fn save(&mut self, value: Value, path: &Path) -> Result<(), KernelError> {
        let key = self.storage_key(path)?;
        if self.ctx.read_stored(&key)?.is_some() {
            return Err(KernelError::StorageOccupied {
                address: self.address,
                path: path.clone(),
            });
        }
        self.ctx.write_record(key, &StoredRecord::Object { value })
    }

    /// Moves the value out of storage. Aborts if it is not a `ty`.
    pub fn load(&mut self, path: &Path, ty: &StaticType) -> Result<Option<Value>, KernelError> {
        let key = self.storage_key(path)?;
        let Some(value) = self.read_object(&key)? else {
            return Ok(None);
        };
        let value = self.ctx.check_cast(force_cast(value, ty))?;
        self.ctx.delete(key);
        Ok(Some(value))
    }

    /// Returns a copy of the stored value. Aborts if it is not a `ty`.
    pub fn copy(&mut self, path: &Path, ty: &StaticType) -> Result<Option<Value>, KernelError> {
        let key = self.storage_key(path)?;
        match self.read_object(&key)? {
            Some(value) => Ok(Some(self.ctx.check_cast(force_cast(value, ty))?)),
            None => Ok(None),
        }
    }

    /// Borrows the stored value as `reference_type`; `None` when the path is
    /// empty or the value does not conform.
    pub fn borrow(&self, path: &Path, reference_type: &StaticType) -> Result<Option<Value>, KernelError> {
        let referenced = reference_type
            .referenced_type()
            .ok_or_else(|| KernelError::NotReferenceType(reference_type.clone()))?;
        let key = self.storage_key(path)?;
        Ok(self
            .read_object(&key)?
            .filter(|value| value.conforms_to(referenced)))
    }

    /// Creates a link at a public or private path pointing at `target`.
    /// Returns `None` without writing if `link_path` is already occupied.
    pub fn link(
        &mut self,
        link_path: &Path,
        target: &Path,
        borrow_type: StaticType,
    ) -> Result<Option<CapabilityValue>, KernelError> {
        let key = self.link_key(link_path)?;
        if !borrow_type.is_reference() {
            return Err(KernelError::NotReferenceType(borrow_type));
        }
        if self.ctx.read_stored(&key)?.is_some() {
            return Ok(None);
        }
        self.ctx.write_record(
            key,
            &StoredRecord::Link {
                target: target.clone(),
                borrow_type: borrow_type.clone(),
            },
        )?;
        Ok(Some(CapabilityValue::new(
            self.address,
            link_path.clone(),
            Some(borrow_type),
        )))
    }

    pub fn unlink(&mut self, link_path: &Path) -> Result<(), KernelError> {
        let key = self.link_key(link_path)?;
        if let Some(StoredRecord::Link { .. }) = self.ctx.read_stored(&key)? {
            self.ctx.delete(key);
        }
        Ok(())
    }

    /// Link target and borrow type at `link_path`, if a link exists there.
    pub fn link_target(&self, link_path: &Path) -> Result<Option<(Path, StaticType)>, KernelError> {
        let key = self.link_key(link_path)?;
        match self.ctx.read_stored(&key)? {
            Some(StoredRecord::Link {
                target,
                borrow_type,
            }) => Ok(Some((target, borrow_type))),
            _ => Ok(None),
        }
    }

    /// Capability for one of this account's public or private paths.
    pub fn get_capability(
        &self,
        link_path: &Path,
        borrow_type: StaticType,
    ) -> Result<CapabilityValue, KernelError> {
        self.link_key(link_path)?;
        if !borrow_type.is_reference() {
            return Err(KernelError::NotReferenceType(borrow_type));
        }
        Ok(CapabilityValue::new(
            self.address,
            link_path.clone(),
            Some(borrow_type),
        ))
    }

    fn read_object(&self, key: &StorageKey) -> Result<Option<Value>, KernelError> {
        match self.ctx.read_stored(key)? {
            Some(StoredRecord::Object { value }) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    fn storage_key(&self, path: &Path) -> Result<StorageKey, KernelError> {
        if path.domain != PathDomain::Storage {
            return Err(KernelError::NotStoragePath(path.clone()));
        }
        Ok(StorageKey::for_path(self.address, path))
    }

    fn link_key(&self, path: &Path) -> Result<StorageKey, KernelError> {
        if path.domain == PathDomain::Storage {
            return Err(KernelError::NotLinkPath(path.clone()));
        }
        Ok(StorageKey::for_path(self.address, path))
    }
}
