pub mod fs;
pub mod mem;

use inbox_store::codec::{from_cbor, to_canonical_cbor};
use inbox_store::{StorageKey, WriteBatch};
use inbox_types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::InboxEvent;

/// Monotonic cursor assigned to every persisted journal entry.
pub type JournalSeq = u64;

/// Ordinal of a committed transaction; independent of `JournalSeq`.
pub type TxSeq = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalKind {
    Event,
    Commit,
}

/// Typed payloads for each `JournalKind`, encoded as canonical CBOR into the
/// entry payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "record_kind", rename_all = "snake_case")]
pub enum JournalRecord {
    Event(EventRecord),
    Commit(CommitRecord),
}

impl JournalRecord {
    pub fn kind(&self) -> JournalKind {
        match self {
            JournalRecord::Event(_) => JournalKind::Event,
            JournalRecord::Commit(_) => JournalKind::Commit,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, JournalError> {
        Ok(to_canonical_cbor(self)?)
    }

    pub fn decode(entry: &OwnedJournalEntry) -> Result<Self, JournalError> {
        let record: JournalRecord = from_cbor(&entry.payload)?;
        if record.kind() != entry.kind {
            return Err(JournalError::Corrupt(format!(
                "entry {} tagged {:?} holds a {:?} record",
                entry.seq,
                entry.kind,
                record.kind()
            )));
        }
        Ok(record)
    }
}

/// One event emitted by a committed transaction, in emission order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub tx_seq: TxSeq,
    pub index: u32,
    pub event: InboxEvent,
}

/// Trailer written after a transaction's events. Once it is durable the
/// transaction is committed; `writes` is the redo set for the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub tx_seq: TxSeq,
    pub signers: Vec<Address>,
    pub writes: Vec<LedgerWrite>,
    pub events: u32,
}

impl CommitRecord {
    /// Rebuilds the write batch this commit applies to the ledger.
    pub fn batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for write in &self.writes {
            match write {
                LedgerWrite::Set { key, bytes } => batch.set(key.clone(), bytes.clone()),
                LedgerWrite::Remove { key } => batch.remove(key.clone()),
            }
        }
        batch
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerWrite {
    Set {
        key: StorageKey,
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
    },
    Remove {
        key: StorageKey,
    },
}

impl LedgerWrite {
    pub fn from_batch(batch: &WriteBatch) -> Vec<Self> {
        batch
            .iter()
            .map(|(key, value)| match value {
                Some(bytes) => LedgerWrite::Set {
                    key: key.clone(),
                    bytes: bytes.to_vec(),
                },
                None => LedgerWrite::Remove { key: key.clone() },
            })
            .collect()
    }
}

/// Borrowed entry used when appending to the journal.
#[derive(Debug, Clone, Copy)]
pub struct JournalEntry<'a> {
    pub kind: JournalKind,
    pub payload: &'a [u8],
}

impl<'a> JournalEntry<'a> {
    pub fn new(kind: JournalKind, payload: &'a [u8]) -> Self {
        Self { kind, payload }
    }
}

/// Owned entry returned by journal readers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnedJournalEntry {
    pub seq: JournalSeq,
    pub kind: JournalKind,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("corrupt entry: {0}")]
    Corrupt(String),
}

/// Append-only sink for committed transaction output.
pub trait Journal: Send {
    fn append(&mut self, entry: JournalEntry<'_>) -> Result<JournalSeq, JournalError>;

    /// Loads entries starting at `from` (inclusive). Passing 0 returns the full log.
    fn load_from(&self, from: JournalSeq) -> Result<Vec<OwnedJournalEntry>, JournalError>;

    /// Returns the next sequence that will be assigned on append.
    fn next_seq(&self) -> JournalSeq;

    fn append_record(&mut self, record: &JournalRecord) -> Result<JournalSeq, JournalError> {
        let payload = record.encode()?;
        self.append(JournalEntry::new(record.kind(), &payload))
    }

    fn load_records(&self, from: JournalSeq) -> Result<Vec<JournalRecord>, JournalError> {
        self.load_from(from)?
            .iter()
            .map(JournalRecord::decode)
            .collect()
    }
}

/// On-disk framing for a single entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskRecord<'a> {
    seq: JournalSeq,
    kind: JournalKind,
    #[serde(with = "serde_bytes")]
    payload: &'a [u8],
}

#[cfg(test)]
mod tests {
    use super::*;
    use inbox_store::StorageDomain;

    #[test]
    fn commit_batch_replays_sets_and_removals() {
        let owner = Address::from_u64(1);
        let kept = StorageKey::new(owner, StorageDomain::Storage, "kept");
        let dropped = StorageKey::new(owner, StorageDomain::Inbox, "dropped");
        let mut batch = WriteBatch::new();
        batch.set(kept.clone(), b"value".to_vec());
        batch.remove(dropped.clone());

        let record = JournalRecord::Commit(CommitRecord {
            tx_seq: 3,
            signers: vec![owner],
            writes: LedgerWrite::from_batch(&batch),
            events: 0,
        });
        let entry = OwnedJournalEntry {
            seq: 0,
            kind: JournalKind::Commit,
            payload: record.encode().unwrap(),
        };
        let JournalRecord::Commit(decoded) = JournalRecord::decode(&entry).unwrap() else {
            panic!("expected a commit record");
        };
        assert_eq!(decoded.batch(), batch);
        assert_eq!(decoded.batch().get(&dropped), Some(None));
    }

    #[test]
    fn decode_rejects_mismatched_kind() {
        let record = JournalRecord::Commit(CommitRecord {
            tx_seq: 0,
            signers: vec![Address::from_u64(1)],
            writes: vec![LedgerWrite::Remove {
                key: StorageKey::new(Address::from_u64(1), StorageDomain::Inbox, "foo"),
            }],
            events: 0,
        });
        let entry = OwnedJournalEntry {
            seq: 4,
            kind: JournalKind::Event,
            payload: record.encode().unwrap(),
        };
        assert!(matches!(
            JournalRecord::decode(&entry),
            Err(JournalError::Corrupt(_))
        ));

        let entry = OwnedJournalEntry {
            kind: JournalKind::Commit,
            ..entry
        };
        assert_eq!(JournalRecord::decode(&entry).unwrap(), record);
    }
}
