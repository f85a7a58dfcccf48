//! `inbox claim` command.

use anyhow::{Context, Result};
use clap::Args;
use inbox_types::{Address, StaticType};
use serde_json::json;

use crate::opts::LedgerOpts;
use crate::output::{print_success, receipt_meta};

#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Name of the inbox entry
    #[arg(long)]
    pub name: String,

    /// Account that published the entry
    #[arg(long)]
    pub provider: Address,

    /// Expected borrow type, e.g. '&[Int]'
    #[arg(long = "type")]
    pub borrow_type: StaticType,
}

pub fn cmd_claim(opts: &LedgerOpts, args: &ClaimArgs) -> Result<()> {
    let recipient = opts.signer()?;
    let mut runtime = opts.open_runtime()?;
    let receipt = runtime
        .transact(recipient, |ctx| {
            let claimed = ctx
                .inbox(recipient)?
                .claim(&args.name, args.provider, &args.borrow_type)?;
            let Some(capability) = claimed else {
                return Ok(None);
            };
            let value = ctx.borrow_capability(&capability)?;
            Ok(Some((capability, value)))
        })
        .with_context(|| format!("claim '{}' from {}", args.name, args.provider))?;

    let meta = receipt_meta(&receipt);
    let Some((capability, value)) = receipt.value else {
        let warnings = vec![format!(
            "nothing from {} under '{}' for {recipient}",
            args.provider, args.name
        )];
        return print_success(opts, json!(null), Some(meta), warnings);
    };
    let mut warnings = vec![];
    if value.is_none() {
        warnings.push(format!("{capability} does not borrow"));
    }
    print_success(
        opts,
        json!({
            "name": args.name,
            "capability": capability.to_string(),
            "value": value.map(|value| value.to_string()),
        }),
        Some(meta),
        warnings,
    )
}
