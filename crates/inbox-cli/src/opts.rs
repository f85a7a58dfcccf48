//! Global CLI options and runtime construction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use inbox_kernel::{FsJournal, Runtime, RuntimeConfig, DEFAULT_MAX_LINK_DEPTH};
use inbox_store::FsLedger;
use inbox_types::Address;

/// Global options for CLI commands.
///
/// These options apply to all commands and can be set via env vars.
#[derive(Args, Debug, Clone)]
pub struct LedgerOpts {
    /// Ledger and journal directory (env: INBOX_ROOT)
    #[arg(short = 'r', long, global = true, env = "INBOX_ROOT", default_value = ".inbox")]
    pub root: PathBuf,

    /// Account signing the transaction, e.g. 0x1 (env: INBOX_SIGNER)
    #[arg(short = 's', long, global = true, env = "INBOX_SIGNER")]
    pub signer: Option<Address>,

    /// Maximum link hops followed when borrowing a capability (env: INBOX_MAX_LINK_DEPTH)
    #[arg(long, global = true, env = "INBOX_MAX_LINK_DEPTH", default_value_t = DEFAULT_MAX_LINK_DEPTH)]
    pub max_link_depth: usize,

    /// JSON output envelope
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output (implies --json)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Suppress notices
    #[arg(long, global = true)]
    pub quiet: bool,
}

impl LedgerOpts {
    pub fn signer(&self) -> Result<Address> {
        self.signer
            .context("no signer: pass --signer <ADDRESS> or set INBOX_SIGNER")
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            max_link_depth: self.max_link_depth,
            ..RuntimeConfig::default()
        }
    }

    /// Opens the on-disk ledger and journal under `--root`.
    pub fn open_runtime(&self) -> Result<Runtime<FsLedger>> {
        log::debug!("opening ledger at {}", self.root.display());
        let ledger = FsLedger::open(&self.root)
            .with_context(|| format!("open ledger at {}", self.root.display()))?;
        let journal = FsJournal::open(&self.root)
            .with_context(|| format!("open journal at {}", self.root.display()))?;
        Runtime::with_config(ledger, Box::new(journal), self.runtime_config())
            .context("replay journal")
    }
}

/// Load `.env` from the working directory without overriding existing
/// environment variables.
pub fn load_env() -> Result<()> {
    load_env_from(Path::new(".env"))
}

fn load_env_from(env_path: &Path) -> Result<()> {
    if env_path.exists() {
        for item in dotenvy::from_path_iter(env_path).context("load .env")? {
            let (key, val) = item?;
            if std::env::var_os(&key).is_none() {
                unsafe {
                    std::env::set_var(&key, &val);
                }
            }
        }
    }
    Ok(())
}
