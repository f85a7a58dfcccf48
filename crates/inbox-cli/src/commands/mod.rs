//! CLI command handlers. Each handler runs one transaction against the
//! ledger under `--root`.

pub mod claim;
pub mod events;
pub mod link;
pub mod publish;
pub mod save;
pub mod unpublish;
