use crate::entry::{EntryType, LedgerEntry};
use chrono::{DateTime, Utc};
use finality_types::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distribution summary over the whole ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub total_entries: usize,
    pub first_entry_at: Option<DateTime<Utc>>,
    pub last_entry_at: Option<DateTime<Utc>>,
    pub by_entry_type: BTreeMap<String, usize>,
    pub by_actor: BTreeMap<String, usize>,
    pub by_artifact_type: BTreeMap<String, usize>,
    pub rejections: usize,
    pub blocks: usize,
    pub gate_failures: usize,
    pub validations_passed: usize,
    pub validations_failed: usize,
    pub finalized: usize,
    pub head_hash: Option<ContentHash>,
}

impl AuditReport {
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        let mut by_entry_type = BTreeMap::new();
        let mut by_actor = BTreeMap::new();
        let mut by_artifact_type = BTreeMap::new();

        for entry in entries {
            *by_entry_type
                .entry(entry.entry_type.as_str().to_string())
                .or_insert(0) += 1;
            *by_actor.entry(entry.actor_id.to_string()).or_insert(0) += 1;
            *by_artifact_type
                .entry(entry.artifact_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let count = |t: EntryType| by_entry_type.get(t.as_str()).copied().unwrap_or(0);

        Self {
            generated_at: Utc::now(),
            total_entries: entries.len(),
            first_entry_at: entries.first().map(|e| e.timestamp),
            last_entry_at: entries.last().map(|e| e.timestamp),
            rejections: count(EntryType::RejectionRecorded),
            blocks: count(EntryType::BlockEnforced),
            gate_failures: count(EntryType::GateFailed),
            validations_passed: count(EntryType::ValidationPassed),
            validations_failed: count(EntryType::ValidationFailed),
            finalized: count(EntryType::FinalityFinalized),
            head_hash: entries.last().map(|e| e.entry_hash),
            by_entry_type,
            by_actor,
            by_artifact_type,
        }
    }
}
