//! Transaction runtime: runs transaction phases against a `TxContext` and
//! commits ledger writes and journal events together on success.
//!
//! Commit order: event records, then the commit record carrying the write
//! set, then the ledger apply. A transaction is committed once its commit
//! record is in the journal. Ledger writes left unapplied by a failure or a
//! crash are redone from that record before the next transaction runs.

use std::fmt;

use inbox_store::Ledger;
use inbox_types::Address;

use crate::config::RuntimeConfig;
use crate::error::{ConditionPhase, KernelError};
use crate::event::InboxEvent;
use crate::journal::{CommitRecord, EventRecord, Journal, JournalRecord, LedgerWrite, TxSeq};
use crate::tx::TxContext;

type Step<'t> = Box<dyn FnOnce(&mut TxContext<'_>) -> Result<(), KernelError> + 't>;
type Condition<'t> = Box<dyn Fn(&mut TxContext<'_>) -> Result<bool, KernelError> + 't>;

/// A transaction in phases: `prepare` steps, `pre` conditions, `execute`,
/// then `post` conditions. Any failure aborts the whole transaction.
pub struct Transaction<'t> {
    signers: Vec<Address>,
    prepare: Vec<Step<'t>>,
    pre: Vec<(String, Condition<'t>)>,
    execute: Option<Step<'t>>,
    post: Vec<(String, Condition<'t>)>,
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("signers", &self.signers)
            .field("prepare", &self.prepare.len())
            .field("pre", &self.pre.iter().map(|(m, _)| m).collect::<Vec<_>>())
            .field("execute", &self.execute.is_some())
            .field("post", &self.post.iter().map(|(m, _)| m).collect::<Vec<_>>())
            .finish()
    }
}

impl<'t> Transaction<'t> {
    pub fn new(signers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            signers: signers.into_iter().collect(),
            prepare: Vec::new(),
            pre: Vec::new(),
            execute: None,
            post: Vec::new(),
        }
    }

    pub fn signed_by(signer: Address) -> Self {
        Self::new([signer])
    }

    pub fn prepare<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut TxContext<'_>) -> Result<(), KernelError> + 't,
    {
        self.prepare.push(Box::new(step));
        self
    }

    pub fn pre<F>(mut self, message: impl Into<String>, condition: F) -> Self
    where
        F: Fn(&mut TxContext<'_>) -> Result<bool, KernelError> + 't,
    {
        self.pre.push((message.into(), Box::new(condition)));
        self
    }

    pub fn execute<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut TxContext<'_>) -> Result<(), KernelError> + 't,
    {
        self.execute = Some(Box::new(step));
        self
    }

    pub fn post<F>(mut self, message: impl Into<String>, condition: F) -> Self
    where
        F: Fn(&mut TxContext<'_>) -> Result<bool, KernelError> + 't,
    {
        self.post.push((message.into(), Box::new(condition)));
        self
    }

    fn run(self, ctx: &mut TxContext<'_>) -> Result<(), KernelError> {
        for step in self.prepare {
            step(&mut *ctx)?;
        }
        check_conditions(ctx, ConditionPhase::Pre, &self.pre)?;
        if let Some(execute) = self.execute {
            execute(&mut *ctx)?;
        }
        check_conditions(ctx, ConditionPhase::Post, &self.post)
    }
}

fn check_conditions(
    ctx: &mut TxContext<'_>,
    phase: ConditionPhase,
    conditions: &[(String, Condition<'_>)],
) -> Result<(), KernelError> {
    for (message, condition) in conditions {
        if !condition(&mut *ctx)? {
            return Err(KernelError::Condition {
                phase,
                message: message.clone(),
            });
        }
    }
    Ok(())
}

/// Output of a committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt<T = ()> {
    pub tx_seq: TxSeq,
    pub value: T,
    pub logs: Vec<String>,
    pub events: Vec<InboxEvent>,
    pub writes: usize,
}

pub struct Runtime<L: Ledger> {
    ledger: L,
    journal: Box<dyn Journal>,
    config: RuntimeConfig,
    next_tx: TxSeq,
    unapplied: Option<CommitRecord>,
}

impl<L: Ledger + fmt::Debug> fmt::Debug for Runtime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("ledger", &self.ledger)
            .field("journal_seq", &self.journal.next_seq())
            .field("config", &self.config)
            .field("next_tx", &self.next_tx)
            .field("unapplied", &self.unapplied.as_ref().map(|commit| commit.tx_seq))
            .finish()
    }
}

impl<L: Ledger> Runtime<L> {
    pub fn new(ledger: L, journal: Box<dyn Journal>) -> Result<Self, KernelError> {
        Self::with_config(ledger, journal, RuntimeConfig::default())
    }

    /// Resumes transaction numbering after the last commit in `journal` and
    /// redoes that commit's writes, which may have been cut short.
    pub fn with_config(
        ledger: L,
        journal: Box<dyn Journal>,
        config: RuntimeConfig,
    ) -> Result<Self, KernelError> {
        let last_commit = journal
            .load_records(0)?
            .into_iter()
            .filter_map(|record| match record {
                JournalRecord::Commit(commit) => Some(commit),
                JournalRecord::Event(_) => None,
            })
            .max_by_key(|commit| commit.tx_seq);
        let next_tx = last_commit.as_ref().map_or(0, |commit| commit.tx_seq + 1);
        let mut runtime = Self {
            ledger,
            journal,
            config,
            next_tx,
            unapplied: last_commit,
        };
        runtime.apply_pending()?;
        Ok(runtime)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn next_tx_seq(&self) -> TxSeq {
        self.next_tx
    }

    pub fn execute(&mut self, transaction: Transaction<'_>) -> Result<TxReceipt, KernelError> {
        let signers = transaction.signers.clone();
        self.run(signers, |ctx| transaction.run(ctx))
    }

    /// Runs `body` as a single-phase transaction and commits on `Ok`.
    ///
    /// A failed force-cast aborts the transaction even when `body` handles
    /// the error and returns `Ok`.
    pub fn run<T, F>(&mut self, signers: Vec<Address>, body: F) -> Result<TxReceipt<T>, KernelError>
    where
        F: FnOnce(&mut TxContext<'_>) -> Result<T, KernelError>,
    {
        self.apply_pending()?;
        let tx_seq = self.next_tx;
        let mut ctx = TxContext::new(&self.ledger, &self.config, signers.clone());
        let value = match body(&mut ctx) {
            Ok(value) => match ctx.aborted() {
                None => value,
                Some(cast) => {
                    let err = KernelError::ForceCast(cast.clone());
                    return Err(rolled_back(tx_seq, &ctx, err));
                }
            },
            Err(err) => return Err(rolled_back(tx_seq, &ctx, err)),
        };
        let (writes, events, logs) = ctx.into_parts();
        let write_count = writes.len();
        let commit = CommitRecord {
            tx_seq,
            signers,
            writes: LedgerWrite::from_batch(&writes),
            events: events.len() as u32,
        };

        if let Err(err) = self.append_commit(&events, &commit) {
            log::warn!("transaction {tx_seq} rolled back, journal append failed: {err}");
            return Err(err);
        }
        self.next_tx += 1;
        if let Err(source) = self.ledger.apply(writes) {
            log::error!("transaction {tx_seq} committed but the ledger apply failed: {source}");
            self.unapplied = Some(commit);
            return Err(KernelError::Unapplied { tx_seq, source });
        }

        if self.config.echo_logs {
            for line in &logs {
                log::info!("tx {tx_seq}: {line}");
            }
        }
        log::debug!(
            "transaction {tx_seq} committed: {write_count} write(s), {} event(s)",
            events.len()
        );
        Ok(TxReceipt {
            tx_seq,
            value,
            logs,
            events,
            writes: write_count,
        })
    }

    fn append_commit(&mut self, events: &[InboxEvent], commit: &CommitRecord) -> Result<(), KernelError> {
        for (index, event) in events.iter().enumerate() {
            self.journal.append_record(&JournalRecord::Event(EventRecord {
                tx_seq: commit.tx_seq,
                index: index as u32,
                event: event.clone(),
            }))?;
        }
        self.journal.append_record(&JournalRecord::Commit(commit.clone()))?;
        Ok(())
    }

    /// Redoes the writes of a commit whose ledger apply did not finish.
    fn apply_pending(&mut self) -> Result<(), KernelError> {
        let Some(commit) = self.unapplied.take() else {
            return Ok(());
        };
        match self.ledger.apply(commit.batch()) {
            Ok(()) => {
                log::debug!(
                    "applied {} write(s) of committed transaction {}",
                    commit.writes.len(),
                    commit.tx_seq
                );
                Ok(())
            }
            Err(source) => {
                let tx_seq = commit.tx_seq;
                self.unapplied = Some(commit);
                Err(KernelError::Unapplied { tx_seq, source })
            }
        }
    }

    /// The committed transaction whose writes still have to reach the ledger.
    pub fn unapplied_tx_seq(&self) -> Option<TxSeq> {
        self.unapplied.as_ref().map(|commit| commit.tx_seq)
    }

    /// Convenience wrapper for a transaction signed by one account.
    pub fn transact<T, F>(&mut self, signer: Address, body: F) -> Result<TxReceipt<T>, KernelError>
    where
        F: FnOnce(&mut TxContext<'_>) -> Result<T, KernelError>,
    {
        self.run(vec![signer], body)
    }

    /// All committed events, oldest first.
    pub fn events(&self) -> Result<Vec<InboxEvent>, KernelError> {
        Ok(committed_events(self.journal.load_records(0)?))
    }
}

fn rolled_back(tx_seq: TxSeq, ctx: &TxContext<'_>, err: KernelError) -> KernelError {
    log::warn!(
        "transaction {tx_seq} rolled back ({} pending write(s), {} event(s) discarded): {err}",
        ctx.pending_writes(),
        ctx.events().len()
    );
    err
}

/// Event records count once the commit record of their transaction follows
/// them. Records left behind by a failed append are skipped, even when a
/// later transaction reuses their `tx_seq`.
fn committed_events(records: Vec<JournalRecord>) -> Vec<InboxEvent> {
    let mut committed = Vec::new();
    let mut pending: Vec<EventRecord> = Vec::new();
    for record in records {
        match record {
            JournalRecord::Event(event) => {
                let continues = pending
                    .last()
                    .is_some_and(|last| last.tx_seq == event.tx_seq && last.index + 1 == event.index);
                if !continues {
                    pending.clear();
                }
                pending.push(event);
            }
            JournalRecord::Commit(commit) => {
                let complete = pending.len() == commit.events as usize
                    && pending.iter().all(|event| event.tx_seq == commit.tx_seq);
                if complete {
                    committed.extend(pending.drain(..).map(|record| record.event));
                }
                pending.clear();
            }
        }
    }
    committed
}
