//! `inbox publish` command.

use anyhow::{Context, Result};
use clap::Args;
use inbox_types::{Address, Path, StaticType};
use serde_json::json;

use crate::opts::LedgerOpts;
use crate::output::{print_success, receipt_meta};

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Public or private path the published capability targets
    #[arg(long)]
    pub capability_path: Path,

    /// Borrow type of the capability, e.g. '&[Int]'
    #[arg(long = "type")]
    pub borrow_type: StaticType,

    /// Name of the inbox entry
    #[arg(long)]
    pub name: String,

    /// Account allowed to claim the entry
    #[arg(long)]
    pub recipient: Address,
}

pub fn cmd_publish(opts: &LedgerOpts, args: &PublishArgs) -> Result<()> {
    let provider = opts.signer()?;
    let mut runtime = opts.open_runtime()?;
    let receipt = runtime
        .transact(provider, |ctx| {
            let mut account = ctx.account(provider)?;
            let capability =
                account.get_capability(&args.capability_path, args.borrow_type.clone())?;
            account
                .inbox()
                .publish(capability, &args.name, args.recipient)
        })
        .with_context(|| format!("publish '{}' from {provider}", args.name))?;

    print_success(
        opts,
        json!({
            "provider": provider.to_string(),
            "recipient": args.recipient.to_string(),
            "name": args.name,
            "type": StaticType::capability(args.borrow_type.clone()).to_string(),
        }),
        Some(receipt_meta(&receipt)),
        vec![],
    )
}
