//! CLI command implementations

pub mod audit;
pub mod query;
pub mod record;
pub mod signal;

use crate::config::FinalityConfig;
use crate::error::CliResult;
use crate::output::OutputFormat;
use anyhow::Context as _;
use finality_ledger::{LedgerStore, RejectionRecorder};
use std::sync::Arc;

/// How a command needs the ledger opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Appends; verified on open when configured.
    Write,
    /// Read-only; verified on open when configured.
    Read,
    /// Read-only and never refused, so a broken chain can be reported.
    Audit,
}

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub config: FinalityConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: FinalityConfig, format: OutputFormat) -> Self {
        Self { config, format }
    }

    pub fn open_ledger(&self, access: Access) -> CliResult<Arc<LedgerStore>> {
        let path = &self.config.ledger.path;
        let (read_only, verify) = match access {
            Access::Write => (false, self.config.ledger.verify_on_open),
            Access::Read => (true, self.config.ledger.verify_on_open),
            Access::Audit => (true, false),
        };
        let store = LedgerStore::open_file(path, read_only, verify)
            .with_context(|| format!("failed to open ledger {path}"))?;
        Ok(Arc::new(store))
    }

    pub fn recorder(&self, ledger: Arc<LedgerStore>) -> RejectionRecorder {
        RejectionRecorder::new(ledger, self.config.authority.recorder_actor.as_str())
    }

    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
