mod commands;
mod opts;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::claim::ClaimArgs;
use commands::link::LinkArgs;
use commands::publish::PublishArgs;
use commands::save::SaveArgs;
use commands::unpublish::UnpublishArgs;
use opts::LedgerOpts;

#[derive(Parser, Debug)]
#[command(name = "inbox", version, about = "Capability inbox CLI")]
struct Cli {
    #[command(flatten)]
    opts: LedgerOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a value under a storage path of the signer
    Save(SaveArgs),

    /// Link a public or private path to a storage path
    Link(LinkArgs),

    /// Publish a capability into the signer's inbox
    Publish(PublishArgs),

    /// Withdraw an unclaimed capability from the signer's inbox
    Unpublish(UnpublishArgs),

    /// Claim a capability another account published for the signer
    Claim(ClaimArgs),

    /// List committed inbox events
    Events,
}

fn main() -> Result<()> {
    opts::load_env()?;
    let cli = Cli::parse();
    setup_logging();
    let opts = &cli.opts;

    match cli.command {
        Command::Save(args) => commands::save::cmd_save(opts, &args),
        Command::Link(args) => commands::link::cmd_link(opts, &args),
        Command::Publish(args) => commands::publish::cmd_publish(opts, &args),
        Command::Unpublish(args) => commands::unpublish::cmd_unpublish(opts, &args),
        Command::Claim(args) => commands::claim::cmd_claim(opts, &args),
        Command::Events => commands::events::cmd_events(opts),
    }
}

/// Kernel `log` records go to stderr; stdout is reserved for command output.
fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}
