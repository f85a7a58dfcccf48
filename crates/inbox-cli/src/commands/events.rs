//! `inbox events` command.

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::opts::LedgerOpts;
use crate::output::print_success;

pub fn cmd_events(opts: &LedgerOpts) -> Result<()> {
    let runtime = opts.open_runtime()?;
    let events = runtime.events().context("read journal")?;
    let data = if opts.json || opts.pretty {
        events
            .iter()
            .map(|event| json!({ "id": event.qualified_id(), "event": event.to_string() }))
            .collect()
    } else {
        Value::String(
            events
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    };
    print_success(opts, data, Some(json!({ "next_tx": runtime.next_tx_seq() })), vec![])
}
