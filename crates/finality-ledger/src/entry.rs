use chrono::{DateTime, Utc};
use finality_types::{
    hash_canonical, ActorId, ArtifactId, CanonicalError, ContentHash, HashDomain, Violation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `prev_hash` of the first entry.
pub const GENESIS_HASH: ContentHash = ContentHash::zero();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    ArtifactIssued,
    ArtifactExecuted,
    ValidationPassed,
    ValidationFailed,
    RejectionRecorded,
    GateFailed,
    BlockEnforced,
    ReviewCompleted,
    AdvisoryUpgradeApproved,
    CorrectionOpened,
    CorrectionClosed,
    PdoCreated,
    PdoTransitioned,
    OpdoBound,
    FinalitySealed,
    FinalityFinalized,
}

impl EntryType {
    pub const ALL: [EntryType; 16] = [
        Self::ArtifactIssued,
        Self::ArtifactExecuted,
        Self::ValidationPassed,
        Self::ValidationFailed,
        Self::RejectionRecorded,
        Self::GateFailed,
        Self::BlockEnforced,
        Self::ReviewCompleted,
        Self::AdvisoryUpgradeApproved,
        Self::CorrectionOpened,
        Self::CorrectionClosed,
        Self::PdoCreated,
        Self::PdoTransitioned,
        Self::OpdoBound,
        Self::FinalitySealed,
        Self::FinalityFinalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArtifactIssued => "ARTIFACT_ISSUED",
            Self::ArtifactExecuted => "ARTIFACT_EXECUTED",
            Self::ValidationPassed => "VALIDATION_PASSED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::RejectionRecorded => "REJECTION_RECORDED",
            Self::GateFailed => "GATE_FAILED",
            Self::BlockEnforced => "BLOCK_ENFORCED",
            Self::ReviewCompleted => "REVIEW_COMPLETED",
            Self::AdvisoryUpgradeApproved => "ADVISORY_UPGRADE_APPROVED",
            Self::CorrectionOpened => "CORRECTION_OPENED",
            Self::CorrectionClosed => "CORRECTION_CLOSED",
            Self::PdoCreated => "PDO_CREATED",
            Self::PdoTransitioned => "PDO_TRANSITIONED",
            Self::OpdoBound => "OPDO_BOUND",
            Self::FinalitySealed => "FINALITY_SEALED",
            Self::FinalityFinalized => "FINALITY_FINALIZED",
        }
    }

    /// Entries that record a refusal of some kind.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RejectionRecorded | Self::GateFailed | Self::BlockEnforced
        )
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown entry type: {s}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactType {
    Request,
    Review,
    WorkProduct,
    Correction,
    Closure,
    Pdo,
    Opdo,
    Signal,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 8] = [
        Self::Request,
        Self::Review,
        Self::WorkProduct,
        Self::Correction,
        Self::Closure,
        Self::Pdo,
        Self::Opdo,
        Self::Signal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Review => "REVIEW",
            Self::WorkProduct => "WORK_PRODUCT",
            Self::Correction => "CORRECTION",
            Self::Closure => "CLOSURE",
            Self::Pdo => "PDO",
            Self::Opdo => "OPDO",
            Self::Signal => "SIGNAL",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown artifact type: {s}"))
    }
}

/// Type-specific body of an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPayload {
    Artifact {
        notes: Option<String>,
    },
    Rejection {
        violation: Violation,
        subject_type: ArtifactType,
        evidence: BTreeMap<String, String>,
    },
    PdoTransition {
        from: Option<String>,
        to: String,
        version: u64,
        detail: Option<String>,
    },
    OpdoTransition {
        from: Option<String>,
        to: String,
        version: u64,
        merkle_root: Option<ContentHash>,
        final_hash: Option<ContentHash>,
        human_review_ref: Option<ArtifactId>,
    },
    Review {
        reviewer: ActorId,
        review_ref: ArtifactId,
        submitted_at: DateTime<Utc>,
        approved_at: DateTime<Utc>,
        latency_ms: i64,
    },
}

impl EntryPayload {
    pub fn artifact(notes: Option<String>) -> Self {
        Self::Artifact { notes }
    }

    /// Target state of a PDO or O-PDO transition payload.
    pub fn transition_target(&self) -> Option<&str> {
        match self {
            Self::PdoTransition { to, .. } | Self::OpdoTransition { to, .. } => Some(to),
            _ => None,
        }
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Rejection { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

/// Everything a producer supplies; the store fills in sequence, timestamp
/// and both hashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDraft {
    pub entry_type: EntryType,
    pub actor_id: ActorId,
    pub artifact_id: ArtifactId,
    pub artifact_type: ArtifactType,
    pub parent_artifact: Option<ArtifactId>,
    pub payload: EntryPayload,
}

impl EntryDraft {
    pub fn new(
        entry_type: EntryType,
        actor_id: impl Into<ActorId>,
        artifact_id: impl Into<ArtifactId>,
        artifact_type: ArtifactType,
        payload: EntryPayload,
    ) -> Self {
        Self {
            entry_type,
            actor_id: actor_id.into(),
            artifact_id: artifact_id.into(),
            artifact_type,
            parent_artifact: None,
            payload,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ArtifactId>) -> Self {
        self.parent_artifact = Some(parent.into());
        self
    }
}

/// Immutable committed ledger record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub entry_type: EntryType,
    pub actor_id: ActorId,
    pub artifact_id: ArtifactId,
    pub artifact_type: ArtifactType,
    pub parent_artifact: Option<ArtifactId>,
    pub payload: EntryPayload,
    pub prev_hash: ContentHash,
    pub entry_hash: ContentHash,
}

/// Fixed-order view of every hashed field. `entry_hash` is excluded.
#[derive(Serialize)]
struct CanonicalEntry<'a> {
    sequence: u64,
    timestamp: &'a DateTime<Utc>,
    entry_type: EntryType,
    actor_id: &'a ActorId,
    artifact_id: &'a ArtifactId,
    artifact_type: ArtifactType,
    parent_artifact: &'a Option<ArtifactId>,
    payload: &'a EntryPayload,
    prev_hash: &'a ContentHash,
}

impl LedgerEntry {
    /// Assemble and hash a new entry.
    pub(crate) fn seal(
        sequence: u64,
        timestamp: DateTime<Utc>,
        prev_hash: ContentHash,
        draft: EntryDraft,
    ) -> Result<Self, CanonicalError> {
        let mut entry = Self {
            sequence,
            timestamp,
            entry_type: draft.entry_type,
            actor_id: draft.actor_id,
            artifact_id: draft.artifact_id,
            artifact_type: draft.artifact_type,
            parent_artifact: draft.parent_artifact,
            payload: draft.payload,
            prev_hash,
            entry_hash: GENESIS_HASH,
        };
        entry.entry_hash = entry.compute_hash()?;
        Ok(entry)
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> Result<ContentHash, CanonicalError> {
        let view = CanonicalEntry {
            sequence: self.sequence,
            timestamp: &self.timestamp,
            entry_type: self.entry_type,
            actor_id: &self.actor_id,
            artifact_id: &self.artifact_id,
            artifact_type: self.artifact_type,
            parent_artifact: &self.parent_artifact,
            payload: &self.payload,
            prev_hash: &self.prev_hash,
        };
        hash_canonical(HashDomain::LedgerEntry, &view)
    }

    /// True if this entry concerns `artifact`, directly or as its parent.
    pub fn references(&self, artifact: &ArtifactId) -> bool {
        &self.artifact_id == artifact || self.parent_artifact.as_ref() == Some(artifact)
    }
}
