use std::sync::{Arc, Mutex};

use super::{Journal, JournalEntry, JournalError, JournalSeq, OwnedJournalEntry};

/// In-memory journal for tests and throwaway runtimes. Clones share entries.
#[derive(Debug, Default, Clone)]
pub struct MemJournal {
    entries: Arc<Mutex<Vec<OwnedJournalEntry>>>,
}

impl MemJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<OwnedJournalEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Journal for MemJournal {
    fn append(&mut self, entry: JournalEntry<'_>) -> Result<JournalSeq, JournalError> {
        let mut guard = self.entries.lock().unwrap();
        let seq = guard.len() as JournalSeq;
        guard.push(OwnedJournalEntry {
            seq,
            kind: entry.kind,
            payload: entry.payload.to_vec(),
        });
        Ok(seq)
    }

    fn load_from(&self, from: JournalSeq) -> Result<Vec<OwnedJournalEntry>, JournalError> {
        Ok(self
            .entries()
            .into_iter()
            .filter(|entry| entry.seq >= from)
            .collect())
    }

    fn next_seq(&self) -> JournalSeq {
        self.entries.lock().unwrap().len() as JournalSeq
    }
}
