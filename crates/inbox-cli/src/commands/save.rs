//! `inbox save` command.

use anyhow::{Context, Result, bail};
use clap::Args;
use inbox_types::{Path, Value};
use serde_json::json;

use crate::opts::LedgerOpts;
use crate::output::{print_success, receipt_meta};

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Storage path, e.g. /storage/foo
    #[arg(long)]
    pub path: Path,

    /// Comma-separated integers, saved as [Int]
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub int_array: Option<Vec<i64>>,

    /// A single String
    #[arg(long)]
    pub string: Option<String>,

    /// A single Int
    #[arg(long, allow_negative_numbers = true)]
    pub int: Option<i64>,
}

impl SaveArgs {
    fn value(&self) -> Result<Value> {
        match (&self.int_array, &self.string, self.int) {
            (Some(items), None, None) => Ok(Value::int_array(items.iter().copied())),
            (None, Some(s), None) => Ok(Value::from(s.as_str())),
            (None, None, Some(n)) => Ok(Value::Int(n)),
            _ => bail!("pass exactly one of --int-array, --string, --int"),
        }
    }
}

pub fn cmd_save(opts: &LedgerOpts, args: &SaveArgs) -> Result<()> {
    let signer = opts.signer()?;
    let value = args.value()?;
    let rendered = value.to_string();
    let value_type = value.static_type().to_string();

    let mut runtime = opts.open_runtime()?;
    let receipt = runtime
        .transact(signer, |ctx| ctx.account(signer)?.save(value, &args.path))
        .with_context(|| format!("save {} in {signer}", args.path))?;

    print_success(
        opts,
        json!({
            "address": signer.to_string(),
            "path": args.path.to_string(),
            "value": rendered,
            "type": value_type,
        }),
        Some(receipt_meta(&receipt)),
        vec![],
    )
}
