//! `inbox link` command.

use anyhow::{Context, Result};
use clap::Args;
use inbox_types::{Path, StaticType};
use serde_json::json;

use crate::opts::LedgerOpts;
use crate::output::{print_success, receipt_meta};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Public or private path to create, e.g. /public/foo
    #[arg(long)]
    pub path: Path,

    /// Path the link points at, e.g. /storage/foo
    #[arg(long)]
    pub target: Path,

    /// Borrow type of the link, e.g. '&[Int]'
    #[arg(long = "type")]
    pub borrow_type: StaticType,
}

pub fn cmd_link(opts: &LedgerOpts, args: &LinkArgs) -> Result<()> {
    let signer = opts.signer()?;
    let mut runtime = opts.open_runtime()?;
    let receipt = runtime
        .transact(signer, |ctx| {
            ctx.account(signer)?
                .link(&args.path, &args.target, args.borrow_type.clone())
        })
        .with_context(|| format!("link {} -> {}", args.path, args.target))?;

    let Some(capability) = &receipt.value else {
        anyhow::bail!("{} is already linked in {signer}", args.path);
    };
    print_success(
        opts,
        json!({
            "capability": capability.to_string(),
            "target": args.target.to_string(),
        }),
        Some(receipt_meta(&receipt)),
        vec![],
    )
}
