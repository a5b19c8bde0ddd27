//! Append-only, hash-chained governance ledger.
//!
//! The ledger is the durability and integrity root of the finality engine:
//! every PDO/O-PDO transition, every rejection and every block is committed
//! here before anyone is told about it.
//!
//! Invariants:
//! - `entry_hash(n)` is reproducible byte-for-byte from entry `n`'s fields.
//! - `prev_hash(0)` is the genesis hash; `prev_hash(n) == entry_hash(n-1)`.
//! - Sequences start at 0 and increase by exactly one.
//! - Entries are never mutated or deleted; there is no API that does either.
//! - A rejection is recorded only once its append succeeded
//!   ([`RejectionRecorder`]); otherwise it escalates to a [`SystemFault`].
//! - Timestamps come from the store's [`Clock`] and never run backwards.
//! - After a failed write the store is halted; memory never runs ahead of
//!   or behind what was acknowledged.

pub mod backend;
pub mod clock;
pub mod entry;
pub mod error;
pub mod filter;
pub mod recorder;
pub mod report;
pub mod store;

pub use backend::{FileBackend, LedgerBackend, MemoryBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{
    ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerEntry, GENESIS_HASH,
};
pub use error::{LedgerError, LedgerResult, SystemFault};
pub use filter::LedgerFilter;
pub use recorder::RejectionRecorder;
pub use report::AuditReport;
pub use store::{verify_entries, ChainVerification, LedgerStore};
