use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use inbox_store::codec::to_canonical_cbor;

use super::{DiskRecord, Journal, JournalEntry, JournalError, JournalSeq, OwnedJournalEntry};

const JOURNAL_DIR: &str = "journal";
const JOURNAL_FILE: &str = "journal.log";

/// Filesystem-backed journal that stores length-prefixed canonical CBOR records.
#[derive(Debug)]
pub struct FsJournal {
    path: PathBuf,
    next_seq: JournalSeq,
}

impl FsJournal {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, JournalError> {
        let journal_dir = root.as_ref().join(JOURNAL_DIR);
        fs::create_dir_all(&journal_dir)?;
        let path = journal_dir.join(JOURNAL_FILE);
        if !path.exists() {
            File::create(&path)?;
        }
        let entries = read_all_records(&path)?;
        let next_seq = entries.last().map(|entry| entry.seq + 1).unwrap_or(0);
        Ok(Self { path, next_seq })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Journal for FsJournal {
    fn append(&mut self, entry: JournalEntry<'_>) -> Result<JournalSeq, JournalError> {
        let seq = self.next_seq;
        let record = DiskRecord {
            seq,
            kind: entry.kind,
            payload: entry.payload,
        };
        let bytes = to_canonical_cbor(&record)?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| JournalError::Corrupt("entry larger than 4GiB".into()))?;
        let mut frame = Vec::with_capacity(4 + bytes.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&bytes);
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&frame)?;
        file.sync_all()?;
        self.next_seq += 1;
        Ok(seq)
    }

    fn load_from(&self, from: JournalSeq) -> Result<Vec<OwnedJournalEntry>, JournalError> {
        let mut entries = read_all_records(&self.path)?;
        entries.retain(|entry| entry.seq >= from);
        Ok(entries)
    }

    fn next_seq(&self) -> JournalSeq {
        self.next_seq
    }
}

fn read_all_records(path: &Path) -> Result<Vec<OwnedJournalEntry>, JournalError> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    let mut entries = Vec::new();
    let mut rest = bytes.as_slice();
    while !rest.is_empty() {
        let Some((header, tail)) = rest.split_first_chunk::<4>() else {
            return Err(JournalError::Corrupt(format!(
                "truncated length header ({} bytes)",
                rest.len()
            )));
        };
        let len = u32::from_le_bytes(*header) as usize;
        if tail.len() < len {
            return Err(JournalError::Corrupt("truncated entry payload".into()));
        }
        let (payload, tail) = tail.split_at(len);
        entries.push(serde_cbor::from_slice::<OwnedJournalEntry>(payload)?);
        rest = tail;
    }
    Ok(entries)
}
