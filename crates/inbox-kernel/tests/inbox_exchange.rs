use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use inbox_kernel::journal::{JournalEntry, JournalKind, JournalSeq, OwnedJournalEntry};
use inbox_kernel::{
    ConditionPhase, FsJournal, InboxEvent, Journal, JournalError, KernelError, MemJournal,
    Runtime, Transaction, TxContext,
};
use inbox_store::{FsLedger, Ledger, MemLedger, StorageKey, StoreError, StoreResult, WriteBatch};
use inbox_types::{Address, CapabilityValue, Path, StaticType, Value};
use tempfile::TempDir;

const PUBLISHED_FOO: &str = "flow.InboxValuePublished(provider: 0x0000000000000001, recipient: 0x0000000000000002, name: \"foo\", type: Type<Capability<&[Int]>>())";
const UNPUBLISHED_FOO: &str =
    "flow.InboxValueUnpublished(provider: 0x0000000000000001, name: \"foo\")";
const CLAIMED_FOO: &str = "flow.InboxValueClaimed(provider: 0x0000000000000001, recipient: 0x0000000000000002, name: \"foo\")";
const SELF_PUBLISHED_FOO: &str = "flow.InboxValuePublished(provider: 0x0000000000000001, recipient: 0x0000000000000001, name: \"foo\", type: Type<Capability<&[Int]>>())";
const SELF_CLAIMED_FOO: &str = "flow.InboxValueClaimed(provider: 0x0000000000000001, recipient: 0x0000000000000001, name: \"foo\")";

fn provider() -> Address {
    Address::from_u64(1)
}

fn recipient() -> Address {
    Address::from_u64(2)
}

fn stranger() -> Address {
    Address::from_u64(3)
}

fn int_array_ref() -> StaticType {
    StaticType::reference(StaticType::array(StaticType::Int))
}

fn string_array_ref() -> StaticType {
    StaticType::reference(StaticType::array(StaticType::String))
}

fn mem_runtime() -> Runtime<MemLedger> {
    Runtime::new(MemLedger::new(), Box::new(MemJournal::new())).expect("empty journal")
}

/// Saves `[3]`, links it publicly as `&[Int]`, and publishes the capability
/// under "foo" for the recipient.
fn publish_foo<L: Ledger>(runtime: &mut Runtime<L>) -> Result<()> {
    let tx = Transaction::signed_by(provider()).prepare(|ctx| {
        let mut account = ctx.account(provider())?;
        account.save(Value::int_array([3]), &Path::storage("foo"))?;
        let capability = account
            .link(&Path::public("foo"), &Path::storage("foo"), int_array_ref())?
            .expect("/public/foo is free");
        account.inbox().publish(capability, "foo", recipient())
    });
    runtime.execute(tx).context("publish foo")?;
    Ok(())
}

fn first_element(ctx: &TxContext<'_>, capability: &CapabilityValue) -> Result<Value, KernelError> {
    let element = ctx
        .borrow_capability(capability)?
        .and_then(|value| value.index(0).cloned());
    Ok(element.expect("capability borrows a non-empty array"))
}

/// Journal that refuses commit records while `fail_commits` is set.
#[derive(Debug, Clone, Default)]
struct FlakyJournal {
    inner: MemJournal,
    fail_commits: Arc<AtomicBool>,
}

impl Journal for FlakyJournal {
    fn append(&mut self, entry: JournalEntry<'_>) -> Result<JournalSeq, JournalError> {
        if entry.kind == JournalKind::Commit && self.fail_commits.load(Ordering::SeqCst) {
            return Err(JournalError::Corrupt("disk full".into()));
        }
        self.inner.append(entry)
    }

    fn load_from(&self, from: JournalSeq) -> Result<Vec<OwnedJournalEntry>, JournalError> {
        self.inner.load_from(from)
    }

    fn next_seq(&self) -> JournalSeq {
        self.inner.next_seq()
    }
}

/// Ledger that stops after the first write of a batch while `torn` is set.
#[derive(Debug, Clone, Default)]
struct TornLedger {
    inner: MemLedger,
    torn: Arc<AtomicBool>,
}

impl Ledger for TornLedger {
    fn get(&self, key: &StorageKey) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        if !self.torn.load(Ordering::SeqCst) {
            return self.inner.apply(batch);
        }
        let mut partial = WriteBatch::new();
        if let Some((key, value)) = batch.into_iter().next() {
            match value {
                Some(bytes) => partial.set(key, bytes),
                None => partial.remove(key),
            }
        }
        self.inner.apply(partial)?;
        Err(StoreError::Io {
            path: "ledger".into(),
            source: io::Error::other("power cut"),
        })
    }
}

fn claim_foo<L: Ledger>(runtime: &mut Runtime<L>) -> Result<Option<Value>, KernelError> {
    let receipt = runtime.transact(recipient(), |ctx| {
        let claimed = ctx
            .inbox(recipient())?
            .claim("foo", provider(), &int_array_ref())?;
        claimed
            .map(|capability| first_element(ctx, &capability))
            .transpose()
    })?;
    Ok(receipt.value)
}

fn event_lines<L: Ledger>(runtime: &Runtime<L>) -> Result<Vec<String>> {
    Ok(runtime.events()?.iter().map(ToString::to_string).collect())
}

#[test]
fn unpublish_returns_the_capability() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(provider(), |ctx| {
        let capability = ctx
            .inbox(provider())?
            .unpublish("foo", &int_array_ref())?
            .expect("foo is published");
        let element = first_element(ctx, &capability)?;
        ctx.log(&element);
        Ok(element)
    })?;

    assert_eq!(receipt.value, Value::Int(3));
    assert_eq!(receipt.logs, vec!["3".to_string()]);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, UNPUBLISHED_FOO]);
    Ok(())
}

#[test]
fn unpublish_with_wrong_type_aborts() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let err = runtime
        .transact(provider(), |ctx| {
            ctx.inbox(provider())?.unpublish("foo", &string_array_ref())?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, KernelError::ForceCast(_)));
    assert_eq!(
        err.to_string(),
        "failed to force-cast value: expected type `Capability<&[String]>`, got `Capability<&[Int]>`"
    );
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    // The aborted removal was rolled back; the entry is still there.
    let receipt = runtime.transact(provider(), |ctx| {
        Ok(ctx.inbox(provider())?.unpublish("foo", &int_array_ref())?.is_some())
    })?;
    assert!(receipt.value);
    Ok(())
}

#[test]
fn unpublish_of_absent_name_is_empty() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(provider(), |ctx| {
        ctx.inbox(provider())?.unpublish("bar", &int_array_ref())
    })?;

    assert_eq!(receipt.value, None);
    assert!(receipt.events.is_empty());
    assert_eq!(receipt.writes, 0);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);
    Ok(())
}

#[test]
fn unpublish_removes_the_entry() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(provider(), |ctx| {
        let mut inbox = ctx.inbox(provider())?;
        let first = inbox.unpublish("foo", &int_array_ref())?;
        let second = inbox.unpublish("foo", &int_array_ref())?;
        Ok((first.is_some(), second.is_none()))
    })?;

    assert_eq!(receipt.value, (true, true));
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, UNPUBLISHED_FOO]);
    Ok(())
}

#[test]
fn unpublish_only_sees_own_inbox() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(recipient(), |ctx| {
        ctx.inbox(recipient())?.unpublish("foo", &int_array_ref())
    })?;
    assert_eq!(receipt.value, None);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    let receipt = runtime.transact(provider(), |ctx| {
        ctx.inbox(provider())?.unpublish("foo", &int_array_ref())
    })?;
    assert!(receipt.value.is_some());
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, UNPUBLISHED_FOO]);
    Ok(())
}

#[test]
fn inbox_requires_a_signer() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let err = runtime
        .transact(recipient(), |ctx| {
            ctx.inbox(provider())?.unpublish("foo", &int_array_ref())
        })
        .unwrap_err();
    assert!(matches!(err, KernelError::NotSigner(address) if address == provider()));
    Ok(())
}

#[test]
fn claim_returns_the_capability() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(recipient(), |ctx| {
        let capability = ctx
            .inbox(recipient())?
            .claim("foo", provider(), &int_array_ref())?
            .expect("foo is claimable");
        let element = first_element(ctx, &capability)?;
        ctx.log(&element);
        Ok(capability)
    })?;

    assert_eq!(receipt.value.address, provider());
    assert_eq!(receipt.value.path, Path::public("foo"));
    assert_eq!(receipt.logs, vec!["3".to_string()]);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn claim_with_wrong_type_aborts_and_keeps_the_entry() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let err = runtime
        .transact(recipient(), |ctx| {
            ctx.inbox(recipient())?
                .claim("foo", provider(), &string_array_ref())
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to force-cast value: expected type `Capability<&[String]>`, got `Capability<&[Int]>`"
    );
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    let receipt = runtime.transact(recipient(), |ctx| {
        ctx.inbox(recipient())?
            .claim("foo", provider(), &int_array_ref())
    })?;
    assert!(receipt.value.is_some());
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn claim_of_absent_name_is_empty() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(recipient(), |ctx| {
        ctx.inbox(recipient())?
            .claim("bar", provider(), &string_array_ref())
    })?;

    assert_eq!(receipt.value, None);
    assert_eq!(receipt.writes, 0);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);
    Ok(())
}

#[test]
fn claim_removes_the_entry() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(recipient(), |ctx| {
        let mut inbox = ctx.inbox(recipient())?;
        let first = inbox.claim("foo", provider(), &int_array_ref())?;
        let second = inbox.claim("foo", provider(), &int_array_ref())?;
        Ok((first.is_some(), second.is_none()))
    })?;

    assert_eq!(receipt.value, (true, true));
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);

    let receipt = runtime.transact(provider(), |ctx| {
        ctx.inbox(provider())?.unpublish("foo", &int_array_ref())
    })?;
    assert_eq!(receipt.value, None);
    Ok(())
}

#[test]
fn claim_by_wrong_recipient_is_empty() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;

    let receipt = runtime.transact(stranger(), |ctx| {
        ctx.inbox(stranger())?
            .claim("foo", provider(), &int_array_ref())
    })?;
    assert_eq!(receipt.value, None);
    assert_eq!(receipt.writes, 0);
    assert!(receipt.events.is_empty());
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    let receipt = runtime.transact(recipient(), |ctx| {
        let capability = ctx
            .inbox(recipient())?
            .claim("foo", provider(), &int_array_ref())?
            .expect("foo is claimable");
        first_element(ctx, &capability)
    })?;
    assert_eq!(receipt.value, Value::Int(3));
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn failed_post_condition_rolls_back_publish() -> Result<()> {
    let mut runtime = mem_runtime();
    let tx = Transaction::signed_by(provider())
        .prepare(|ctx| {
            let mut account = ctx.account(provider())?;
            account.save(Value::int_array([3]), &Path::storage("foo"))?;
            let capability = account.get_capability(&Path::public("foo"), int_array_ref())?;
            account.inbox().publish(capability, "foo", recipient())
        })
        .post("publish is never final", |_| Ok(false));

    let err = runtime.execute(tx).unwrap_err();
    assert!(matches!(
        err,
        KernelError::Condition {
            phase: ConditionPhase::Post,
            ..
        }
    ));
    assert_eq!(err.to_string(), "post-condition failed: publish is never final");
    assert!(runtime.events()?.is_empty());
    assert!(runtime.ledger().is_empty());
    assert_eq!(runtime.next_tx_seq(), 0);

    let receipt = runtime.transact(recipient(), |ctx| {
        ctx.inbox(recipient())?
            .claim("foo", provider(), &int_array_ref())
    })?;
    assert_eq!(receipt.value, None);
    Ok(())
}

#[test]
fn phases_run_in_order() -> Result<()> {
    let mut runtime = mem_runtime();
    let tx = Transaction::signed_by(provider())
        .prepare(|ctx| {
            ctx.log("prepare");
            let mut account = ctx.account(provider())?;
            account.save(Value::int_array([3]), &Path::storage("foo"))?;
            let capability = account.get_capability(&Path::public("foo"), int_array_ref())?;
            account.inbox().publish(capability, "foo", recipient())
        })
        .pre("prepare published one entry", |ctx| {
            Ok(ctx.events().len() == 1)
        })
        .execute(|ctx| {
            ctx.log("execute");
            Ok(())
        })
        .post("prepare ran first", |ctx| {
            Ok(ctx.logs() == ["prepare".to_string(), "execute".to_string()])
        });

    let receipt = runtime.execute(tx)?;
    assert_eq!(receipt.tx_seq, 0);
    assert_eq!(receipt.logs, vec!["prepare", "execute"]);
    assert_eq!(receipt.events.len(), 1);
    Ok(())
}

#[test]
fn publish_and_claim_in_one_transaction() -> Result<()> {
    let mut runtime = mem_runtime();
    let tx = Transaction::new([provider(), recipient()]).prepare(|ctx| {
        let mut account = ctx.account(provider())?;
        account.save(Value::string_array(["hello"]), &Path::storage("greeting"))?;
        let borrow_type = StaticType::reference(StaticType::array(StaticType::String));
        let capability = account
            .link(&Path::private("greeting"), &Path::storage("greeting"), borrow_type.clone())?
            .expect("/private/greeting is free");
        account.inbox().publish(capability, "greeting", recipient())?;

        let claimed = ctx
            .inbox(recipient())?
            .claim("greeting", provider(), &borrow_type)?
            .expect("claim sees the pending entry");
        let element = first_element(ctx, &claimed)?;
        ctx.log(element);
        Ok(())
    });

    let receipt = runtime.execute(tx)?;
    assert_eq!(receipt.logs, vec!["\"hello\""]);
    let kinds: Vec<_> = receipt.events.iter().map(InboxEvent::type_name).collect();
    assert_eq!(kinds, vec!["InboxValuePublished", "InboxValueClaimed"]);
    Ok(())
}

#[test]
fn fs_runtime_resumes_after_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let mut runtime = Runtime::new(
            FsLedger::open(dir.path())?,
            Box::new(FsJournal::open(dir.path())?),
        )?;
        publish_foo(&mut runtime)?;
        assert_eq!(runtime.next_tx_seq(), 1);
    }

    let mut runtime = Runtime::new(
        FsLedger::open(dir.path())?,
        Box::new(FsJournal::open(dir.path())?),
    )?;
    assert_eq!(runtime.next_tx_seq(), 1);
    let receipt = runtime.transact(recipient(), |ctx| {
        let capability = ctx
            .inbox(recipient())?
            .claim("foo", provider(), &int_array_ref())?
            .expect("entry survives reopen");
        first_element(ctx, &capability)
    })?;
    assert_eq!(receipt.tx_seq, 1);
    assert_eq!(receipt.value, Value::Int(3));
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn caught_claim_cast_error_still_aborts() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;
    let records = runtime.ledger().len();

    let err = runtime
        .transact(recipient(), |ctx| {
            let claimed = ctx
                .inbox(recipient())?
                .claim("foo", provider(), &string_array_ref());
            Ok(claimed.is_err())
        })
        .unwrap_err();

    assert!(matches!(err, KernelError::ForceCast(_)));
    assert_eq!(runtime.ledger().len(), records);
    assert_eq!(runtime.next_tx_seq(), 1);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    assert_eq!(claim_foo(&mut runtime)?, Some(Value::Int(3)));
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn caught_unpublish_cast_error_discards_later_writes() -> Result<()> {
    let mut runtime = mem_runtime();
    publish_foo(&mut runtime)?;
    let records = runtime.ledger().len();

    let err = runtime
        .transact(provider(), |ctx| {
            let unpublished = ctx.inbox(provider())?.unpublish("foo", &string_array_ref());
            ctx.account(provider())?
                .save(Value::Int(1), &Path::storage("after"))?;
            Ok(unpublished.is_err())
        })
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to force-cast value: expected type `Capability<&[String]>`, got `Capability<&[Int]>`"
    );
    assert_eq!(runtime.ledger().len(), records);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    let receipt = runtime.transact(provider(), |ctx| {
        ctx.inbox(provider())?.unpublish("foo", &int_array_ref())
    })?;
    assert!(receipt.value.is_some());
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, UNPUBLISHED_FOO]);
    Ok(())
}

#[test]
fn failed_commit_append_changes_nothing() -> Result<()> {
    let journal = FlakyJournal::default();
    let fail_commits = journal.fail_commits.clone();
    let mut runtime = Runtime::new(MemLedger::new(), Box::new(journal))?;
    publish_foo(&mut runtime)?;
    let records = runtime.ledger().len();

    fail_commits.store(true, Ordering::SeqCst);
    let err = claim_foo(&mut runtime).unwrap_err();
    assert!(matches!(err, KernelError::Journal(_)));
    assert_eq!(runtime.ledger().len(), records);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);
    assert_eq!(runtime.next_tx_seq(), 1);
    assert_eq!(runtime.unapplied_tx_seq(), None);

    // The retry reuses tx 1; the event record left by the failed attempt
    // must not show up twice.
    fail_commits.store(false, Ordering::SeqCst);
    assert_eq!(claim_foo(&mut runtime)?, Some(Value::Int(3)));
    assert_eq!(runtime.next_tx_seq(), 2);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn torn_ledger_apply_is_redone_before_the_next_transaction() -> Result<()> {
    let ledger = TornLedger::default();
    let mut runtime = Runtime::new(ledger.clone(), Box::new(MemJournal::new()))?;

    ledger.torn.store(true, Ordering::SeqCst);
    let err = publish_foo(&mut runtime).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<KernelError>(),
        Some(KernelError::Unapplied { tx_seq: 0, .. })
    ));
    assert_eq!(ledger.inner.len(), 1);
    assert_eq!(runtime.unapplied_tx_seq(), Some(0));
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO]);

    assert!(matches!(
        claim_foo(&mut runtime),
        Err(KernelError::Unapplied { tx_seq: 0, .. })
    ));
    assert_eq!(runtime.next_tx_seq(), 1);

    ledger.torn.store(false, Ordering::SeqCst);
    assert_eq!(claim_foo(&mut runtime)?, Some(Value::Int(3)));
    assert_eq!(runtime.unapplied_tx_seq(), None);
    assert_eq!(event_lines(&runtime)?, vec![PUBLISHED_FOO, CLAIMED_FOO]);
    Ok(())
}

#[test]
fn torn_ledger_apply_is_redone_on_reopen() -> Result<()> {
    let ledger = TornLedger::default();
    let journal = MemJournal::new();
    {
        let mut runtime = Runtime::new(ledger.clone(), Box::new(journal.clone()))?;
        ledger.torn.store(true, Ordering::SeqCst);
        assert!(publish_foo(&mut runtime).is_err());
        assert_eq!(ledger.inner.len(), 1);
    }

    ledger.torn.store(false, Ordering::SeqCst);
    let mut runtime = Runtime::new(ledger.clone(), Box::new(journal))?;
    assert_eq!(ledger.inner.len(), 3);
    assert_eq!(runtime.next_tx_seq(), 1);
    assert_eq!(runtime.unapplied_tx_seq(), None);
    assert_eq!(claim_foo(&mut runtime)?, Some(Value::Int(3)));
    Ok(())
}

#[test]
fn provider_can_publish_to_itself_and_claim_it_back() -> Result<()> {
    let mut runtime = mem_runtime();
    runtime.transact(provider(), |ctx| {
        let mut account = ctx.account(provider())?;
        account.save(Value::int_array([3]), &Path::storage("foo"))?;
        let capability = account
            .link(&Path::public("foo"), &Path::storage("foo"), int_array_ref())?
            .expect("/public/foo is free");
        account.inbox().publish(capability, "foo", provider())
    })?;
    assert_eq!(event_lines(&runtime)?, vec![SELF_PUBLISHED_FOO]);

    assert_eq!(claim_foo(&mut runtime)?, None);

    let receipt = runtime.transact(provider(), |ctx| {
        let mut inbox = ctx.inbox(provider())?;
        let first = inbox.claim("foo", provider(), &int_array_ref())?;
        let second = inbox.claim("foo", provider(), &int_array_ref())?;
        let element = first
            .map(|capability| first_element(ctx, &capability))
            .transpose()?;
        Ok((element, second.is_none()))
    })?;
    assert_eq!(receipt.value, (Some(Value::Int(3)), true));
    assert_eq!(event_lines(&runtime)?, vec![SELF_PUBLISHED_FOO, SELF_CLAIMED_FOO]);
    Ok(())
}
