use crate::backend::{FileBackend, LedgerBackend, MemoryBackend};
use crate::clock::{Clock, SystemClock};
use crate::entry::{EntryDraft, EntryType, LedgerEntry, GENESIS_HASH};
use crate::error::{LedgerError, LedgerResult};
use crate::filter::LedgerFilter;
use crate::report::AuditReport;
use chrono::{DateTime, Utc};
use finality_types::{
    ActorId, ArtifactId, CanonicalError, ContentHash, CryptographicViolation, SequencingViolation,
    Violation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Result of walking the whole chain once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub entries_checked: usize,
    /// Sequence of the first entry with any violation.
    pub first_break: Option<u64>,
    pub head_hash: Option<ContentHash>,
    pub violations: Vec<Violation>,
}

impl ChainVerification {
    pub fn has_tampering(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, Violation::Cryptographic(_)))
    }
}

/// Walk `entries` recomputing every hash, every link and the sequence.
///
/// Each `prev_hash` is compared against the recomputed hash of its
/// predecessor, so a mutated entry `n` shows up as a mismatch at `n` and a
/// broken link at `n + 1`.
pub fn verify_entries(entries: &[LedgerEntry]) -> Result<ChainVerification, CanonicalError> {
    let mut violations: Vec<Violation> = Vec::new();
    let mut first_break = None;
    let mut expected_seq = 0u64;
    let mut seen = BTreeSet::new();
    let mut expected_prev = GENESIS_HASH;

    for entry in entries {
        let before = violations.len();

        if !seen.insert(entry.sequence) {
            violations.push(
                SequencingViolation::DuplicateSequence {
                    sequence: entry.sequence,
                }
                .into(),
            );
        } else if entry.sequence != expected_seq {
            violations.push(
                SequencingViolation::SequenceGap {
                    expected: expected_seq,
                    found: entry.sequence,
                }
                .into(),
            );
        }

        if entry.prev_hash != expected_prev {
            violations.push(
                CryptographicViolation::ChainBroken {
                    sequence: entry.sequence,
                    expected: expected_prev,
                    found: entry.prev_hash,
                }
                .into(),
            );
        }

        let computed = entry.compute_hash()?;
        if computed != entry.entry_hash {
            violations.push(
                CryptographicViolation::HashMismatch {
                    sequence: entry.sequence,
                    stored: entry.entry_hash,
                    computed,
                }
                .into(),
            );
        }

        if violations.len() > before && first_break.is_none() {
            first_break = Some(entry.sequence);
        }

        expected_prev = computed;
        expected_seq = expected_seq.max(entry.sequence.saturating_add(1));
    }

    Ok(ChainVerification {
        valid: violations.is_empty(),
        entries_checked: entries.len(),
        first_break,
        head_hash: entries.last().map(|e| e.entry_hash),
        violations,
    })
}

/// The append-only, hash-chained store.
///
/// Appends are linearized by the writer mutex. Readers take the entries
/// lock and always see whole committed entries; an entry becomes visible
/// only after its backend write succeeded. A write that fails halts the
/// store: the backend may hold part of it, so nothing more is appended
/// until the ledger is reopened and verified.
pub struct LedgerStore {
    writer: Mutex<Writer>,
    entries: RwLock<Vec<LedgerEntry>>,
    clock: Arc<dyn Clock>,
    location: String,
}

struct Writer {
    backend: Box<dyn LedgerBackend>,
    halted: Option<String>,
}

impl Writer {
    fn new(backend: Box<dyn LedgerBackend>) -> Self {
        Self {
            backend,
            halted: None,
        }
    }
}

impl LedgerStore {
    /// Load whatever the backend holds, without verifying it.
    pub fn open(backend: Box<dyn LedgerBackend>) -> LedgerResult<Self> {
        let entries = backend.load()?;
        let location = backend.describe();
        info!(
            location = %location,
            entries = entries.len(),
            read_only = backend.is_read_only(),
            "ledger opened"
        );
        Ok(Self {
            writer: Mutex::new(Writer::new(backend)),
            entries: RwLock::new(entries),
            clock: Arc::new(SystemClock),
            location,
        })
    }

    /// Open and refuse a broken chain.
    pub fn open_verified(backend: Box<dyn LedgerBackend>) -> LedgerResult<Self> {
        let store = Self::open(backend)?;
        let report = store.verify_chain()?;
        if !report.valid {
            return Err(LedgerError::IntegrityFailure {
                violations: report.violations.len(),
                first_break: report.first_break,
            });
        }
        Ok(store)
    }

    pub fn in_memory() -> Self {
        Self {
            writer: Mutex::new(Writer::new(Box::new(MemoryBackend::new()))),
            entries: RwLock::new(Vec::new()),
            clock: Arc::new(SystemClock),
            location: "memory".into(),
        }
    }

    /// Replace the time source. Set before the store is shared.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time on the ledger's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// File-backed ledger. `verify` refuses to open a broken chain.
    pub fn open_file(path: impl AsRef<Path>, read_only: bool, verify: bool) -> LedgerResult<Self> {
        let backend: Box<dyn LedgerBackend> = if read_only {
            Box::new(FileBackend::open_read_only(path))
        } else {
            Box::new(FileBackend::open(path)?)
        };
        if verify {
            Self::open_verified(backend)
        } else {
            Self::open(backend)
        }
    }

    /// Commit one entry: next sequence, link to the last committed hash,
    /// stamp from the clock, hash the canonical form, persist, then publish.
    pub fn append(&self, draft: EntryDraft) -> LedgerResult<LedgerEntry> {
        let mut writer = self.writer.lock().map_err(|_| LedgerError::LockPoisoned)?;
        if let Some(reason) = &writer.halted {
            return Err(LedgerError::Halted {
                reason: reason.clone(),
            });
        }
        if writer.backend.is_read_only() {
            return Err(LedgerError::ReadOnly);
        }

        let (sequence, prev_hash, timestamp) = {
            let entries = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
            let now = self.clock.now();
            match entries.last() {
                // Timestamps never run backwards, even if the clock does.
                Some(last) => {
                    let next = last
                        .sequence
                        .checked_add(1)
                        .ok_or(LedgerError::SequenceExhausted {
                            last: last.sequence,
                        })?;
                    (next, last.entry_hash, now.max(last.timestamp))
                }
                None => (0, GENESIS_HASH, now),
            }
        };

        let entry = LedgerEntry::seal(sequence, timestamp, prev_hash, draft)?;
        if let Err(err) = writer.backend.persist(&entry) {
            error!(
                sequence,
                location = %self.location,
                error = %err,
                "ledger write failed; store halted"
            );
            writer.halted = Some(err.to_string());
            return Err(err);
        }

        self.entries
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?
            .push(entry.clone());

        debug!(
            sequence,
            entry_type = %entry.entry_type,
            artifact = %entry.artifact_id,
            hash = %entry.entry_hash,
            "ledger entry committed"
        );
        Ok(entry)
    }

    pub fn verify_chain(&self) -> LedgerResult<ChainVerification> {
        let report = self.with_snapshot(verify_entries)??;
        if report.valid {
            info!(entries = report.entries_checked, "ledger chain verified");
        } else {
            warn!(
                entries = report.entries_checked,
                violations = report.violations.len(),
                first_break = ?report.first_break,
                "ledger chain verification failed"
            );
        }
        Ok(report)
    }

    /// Run `f` against a consistent view of all committed entries.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&[LedgerEntry]) -> R) -> LedgerResult<R> {
        let entries = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(f(&entries))
    }

    pub fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        self.with_snapshot(|entries| entries.to_vec())
    }

    pub fn get(&self, sequence: u64) -> LedgerResult<Option<LedgerEntry>> {
        self.with_snapshot(|entries| entries.iter().find(|e| e.sequence == sequence).cloned())
    }

    pub fn query(&self, filter: &LedgerFilter) -> LedgerResult<Vec<LedgerEntry>> {
        self.with_snapshot(|entries| {
            entries
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect()
        })
    }

    pub fn by_actor(&self, actor: &ActorId) -> LedgerResult<Vec<LedgerEntry>> {
        self.query(&LedgerFilter::new().with_actor(actor.clone()))
    }

    pub fn by_type(&self, entry_type: EntryType) -> LedgerResult<Vec<LedgerEntry>> {
        self.query(&LedgerFilter::new().with_type(entry_type))
    }

    pub fn by_artifact(&self, artifact: &ArtifactId) -> LedgerResult<Vec<LedgerEntry>> {
        self.query(&LedgerFilter::new().with_artifact(artifact.clone()))
    }

    pub fn report(&self) -> LedgerResult<AuditReport> {
        self.with_snapshot(AuditReport::from_entries)
    }

    pub fn len(&self) -> LedgerResult<usize> {
        self.with_snapshot(|entries| entries.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        self.with_snapshot(|entries| entries.is_empty())
    }

    pub fn head_hash(&self) -> LedgerResult<Option<ContentHash>> {
        self.with_snapshot(|entries| entries.last().map(|e| e.entry_hash))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether a failed write has halted appends.
    pub fn is_halted(&self) -> bool {
        self.writer
            .lock()
            .map(|w| w.halted.is_some())
            .unwrap_or(true)
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
