use crate::{Ledger, StorageKey, StoreResult, WriteBatch, io_error};
use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

const LEDGER_DIR: &str = "ledger";
const RECORD_EXT: &str = "rec";

/// Filesystem-backed ledger rooted at `<root>/ledger`.
///
/// Records live at `<address>/<domain>/<hex(key)>.rec`. Each record is replaced
/// through a temp file and `rename`, so a record is always either the old or
/// the new bytes. A batch spanning several records is not crash-atomic.
#[derive(Clone)]
pub struct FsLedger {
    root: PathBuf,
}

impl fmt::Debug for FsLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsLedger").field("root", &self.root).finish()
    }
}

impl FsLedger {
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().join(LEDGER_DIR);
        fs::create_dir_all(&root).map_err(|e| io_error(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &StorageKey) -> PathBuf {
        self.root
            .join(key.owner.to_hex())
            .join(key.domain.as_str())
            .join(format!("{}.{RECORD_EXT}", hex::encode(key.key.as_bytes())))
    }

    fn write_record(path: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let tmp = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| io_error(&tmp, e))?;
        file.write_all(bytes).map_err(|e| io_error(&tmp, e))?;
        file.sync_all().map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| io_error(path, e))
    }

    fn remove_record(path: &Path) -> StoreResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(path, err)),
        }
    }
}

impl Ledger for FsLedger {
    fn get(&self, key: &StorageKey) -> StoreResult<Option<Vec<u8>>> {
        let path = self.record_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(path, err)),
        }
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let count = batch.len();
        for (key, value) in batch {
            let path = self.record_path(&key);
            match value {
                Some(bytes) => Self::write_record(&path, &bytes)?,
                None => Self::remove_record(&path)?,
            }
        }
        log::debug!("applied {count} record write(s) under {:?}", self.root);
        Ok(())
    }
}
