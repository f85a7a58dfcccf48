//! `inbox unpublish` command.

use anyhow::{Context, Result};
use clap::Args;
use inbox_types::StaticType;
use serde_json::json;

use crate::opts::LedgerOpts;
use crate::output::{print_success, receipt_meta};

#[derive(Args, Debug)]
pub struct UnpublishArgs {
    /// Name of the inbox entry
    #[arg(long)]
    pub name: String,

    /// Expected borrow type, e.g. '&[Int]'
    #[arg(long = "type")]
    pub borrow_type: StaticType,
}

pub fn cmd_unpublish(opts: &LedgerOpts, args: &UnpublishArgs) -> Result<()> {
    let provider = opts.signer()?;
    let mut runtime = opts.open_runtime()?;
    let receipt = runtime
        .transact(provider, |ctx| {
            ctx.inbox(provider)?.unpublish(&args.name, &args.borrow_type)
        })
        .with_context(|| format!("unpublish '{}' from {provider}", args.name))?;

    let warnings = match receipt.value {
        Some(_) => vec![],
        None => vec![format!("nothing published under '{}'", args.name)],
    };
    print_success(
        opts,
        json!({
            "name": args.name,
            "capability": receipt.value.as_ref().map(ToString::to_string),
        }),
        Some(receipt_meta(&receipt)),
        warnings,
    )
}
