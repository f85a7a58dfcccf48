//! Shared output helpers for human and JSON modes.
//!
//! Human mode prints primary data to stdout and notices to stderr. JSON mode
//! wraps responses in `{ data, meta?, warnings? }` and respects `--pretty`
//! and `--quiet`.

use std::io::Write;

use anyhow::Result;
use serde_json::{Map, Value, json};

use crate::opts::LedgerOpts;

pub fn print_success(
    opts: &LedgerOpts,
    data: Value,
    meta: Option<Value>,
    mut warnings: Vec<String>,
) -> Result<()> {
    if opts.quiet {
        warnings.clear();
    }
    if opts.pretty || opts.json {
        print_json(opts, data, meta, warnings)
    } else {
        print_human(data, warnings)
    }
}

fn print_json(
    opts: &LedgerOpts,
    data: Value,
    meta: Option<Value>,
    warnings: Vec<String>,
) -> Result<()> {
    let mut root = Map::new();
    root.insert("data".into(), data);
    if let Some(meta) = meta {
        root.insert("meta".into(), meta);
    }
    if !warnings.is_empty() {
        root.insert(
            "warnings".into(),
            warnings.into_iter().map(Value::String).collect(),
        );
    }
    let root = Value::Object(root);
    if opts.pretty {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        println!("{}", serde_json::to_string(&root)?);
    }
    Ok(())
}

fn print_human(data: Value, warnings: Vec<String>) -> Result<()> {
    let mut stderr = std::io::stderr();
    for w in warnings {
        writeln!(stderr, "notice: {w}")?;
    }
    match data {
        Value::String(s) => println!("{s}"),
        Value::Null => {}
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}

/// Transaction summary attached as `meta` in JSON mode.
pub fn receipt_meta<T>(receipt: &inbox_kernel::TxReceipt<T>) -> Value {
    json!({
        "tx_seq": receipt.tx_seq,
        "writes": receipt.writes,
        "events": receipt.events.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}
