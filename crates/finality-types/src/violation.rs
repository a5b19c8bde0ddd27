//! Closed violation taxonomy.
//!
//! Every rejection, gate failure, block and audit finding is one of these
//! variants. Each carries the evidence needed to understand it without
//! re-running the check, a stable `GS_xxx` code, and a severity fixed by its
//! family.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationFamily {
    Structural,
    Sequencing,
    Cryptographic,
    StateMachine,
    Boundary,
}

impl ViolationFamily {
    pub fn severity(self) -> Severity {
        match self {
            Self::Structural => Severity::Correctable,
            Self::Sequencing | Self::StateMachine => Severity::Blocking,
            Self::Cryptographic | Self::Boundary => Severity::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Sequencing => "sequencing",
            Self::Cryptographic => "cryptographic",
            Self::StateMachine => "state_machine",
            Self::Boundary => "boundary",
        }
    }
}

impl fmt::Display for ViolationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks only the offending artifact; fixable by resubmission.
    Correctable,
    /// Blocks the dependent chain or the requested transition.
    Blocking,
    /// Implies tampering or an authority breach; halts dependent operations.
    Critical,
}

/// Missing or malformed input.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralViolation {
    #[error("GS_001: {subject} is missing required field `{field}`")]
    MissingField { subject: String, field: String },

    #[error("GS_002: field `{field}` has invalid value {value:?}")]
    InvalidIdentifier { field: String, value: String },

    #[error("GS_003: unknown subject {subject_id}")]
    UnknownSubject { subject_id: String },

    #[error("GS_009: rejected by {by}: {reason}")]
    ExplicitRejection { by: String, reason: String },

    #[error("GS_400: candidate child set is empty")]
    EmptyChildSet,

    #[error("GS_402: child {child_id} has status {status}, expected VALIDATED")]
    ChildNotValidated { child_id: String, status: String },

    #[error("GS_403: child {child_id} has no validating record")]
    MissingValidationRecord { child_id: String },

    #[error("GS_404: contributor {actor_id} appears more than once (again on {child_id})")]
    DuplicateContributor { actor_id: String, child_id: String },

    #[error("GS_405: child {child_id} is bound more than once")]
    DuplicateChild { child_id: String },

    #[error("GS_411: child {child_id} depends on {dependency}, which is not in the bound set")]
    MissingDependency { child_id: String, dependency: String },

    #[error("GS_440: no orchestrating authority configured")]
    MissingOrchestrator,
}

impl StructuralViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "GS_001",
            Self::InvalidIdentifier { .. } => "GS_002",
            Self::UnknownSubject { .. } => "GS_003",
            Self::ExplicitRejection { .. } => "GS_009",
            Self::EmptyChildSet => "GS_400",
            Self::ChildNotValidated { .. } => "GS_402",
            Self::MissingValidationRecord { .. } => "GS_403",
            Self::DuplicateContributor { .. } => "GS_404",
            Self::DuplicateChild { .. } => "GS_405",
            Self::MissingDependency { .. } => "GS_411",
            Self::MissingOrchestrator => "GS_440",
        }
    }
}

/// Broken ordering between dependent records.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequencingViolation {
    #[error("GS_010: sequence gap, expected {expected} found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("GS_011: duplicate sequence {sequence}")]
    DuplicateSequence { sequence: u64 },

    #[error("GS_012: {subject_id} is {current} but has no ledger record for prior state {missing}")]
    MissingPriorRecord {
        subject_id: String,
        current: String,
        missing: String,
    },

    #[error("GS_013: {subject_id} is not reachable from the intact ledger chain")]
    OrphanedRecord { subject_id: String },

    #[error("GS_014: review latency {actual_ms}ms is below the required {required_ms}ms")]
    ReviewLatencyNotMet { required_ms: i64, actual_ms: i64 },

    #[error("GS_410: dependency cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },
}

impl SequencingViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SequenceGap { .. } => "GS_010",
            Self::DuplicateSequence { .. } => "GS_011",
            Self::MissingPriorRecord { .. } => "GS_012",
            Self::OrphanedRecord { .. } => "GS_013",
            Self::ReviewLatencyNotMet { .. } => "GS_014",
            Self::CycleDetected { .. } => "GS_410",
        }
    }
}

/// Hash or proof mismatch.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CryptographicViolation {
    #[error("GS_020: entry {sequence} hash mismatch (stored {stored}, computed {computed})")]
    HashMismatch {
        sequence: u64,
        stored: ContentHash,
        computed: ContentHash,
    },

    #[error("GS_021: chain broken at {sequence} (prev_hash {found}, expected {expected})")]
    ChainBroken {
        sequence: u64,
        expected: ContentHash,
        found: ContentHash,
    },

    #[error("GS_022: proof chain of {subject_id} is inconsistent at link `{link}`")]
    ProofChainInconsistent { subject_id: String, link: String },

    #[error("GS_421: merkle root mismatch for {subject_id} (stored {stored}, computed {computed})")]
    MerkleRootMismatch {
        subject_id: String,
        stored: ContentHash,
        computed: ContentHash,
    },

    #[error("GS_422: leaf {leaf} occurs more than once")]
    HashCollision { leaf: ContentHash },

    #[error("GS_423: non-deterministic root for {subject_id} ({first} then {second})")]
    NonDeterministicHash {
        subject_id: String,
        first: ContentHash,
        second: ContentHash,
    },

    #[error("GS_443: final hash mismatch for {subject_id} (stored {stored}, computed {computed})")]
    FinalHashMismatch {
        subject_id: String,
        stored: ContentHash,
        computed: ContentHash,
    },
}

impl CryptographicViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::HashMismatch { .. } => "GS_020",
            Self::ChainBroken { .. } => "GS_021",
            Self::ProofChainInconsistent { .. } => "GS_022",
            Self::MerkleRootMismatch { .. } => "GS_421",
            Self::HashCollision { .. } => "GS_422",
            Self::NonDeterministicHash { .. } => "GS_423",
            Self::FinalHashMismatch { .. } => "GS_443",
        }
    }
}

/// Illegal or premature lifecycle transition.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateMachineViolation {
    #[error("GS_430: {subject_id} cannot move from {from} to {to}")]
    IllegalTransition {
        subject_id: String,
        from: String,
        to: String,
    },

    #[error("GS_431: {subject_id} is terminal ({state})")]
    AlreadyFinal { subject_id: String, state: String },

    #[error("GS_432: premature finality for {subject_id}: {reason}")]
    PrematureFinality { subject_id: String, reason: String },

    #[error("GS_433: {subject_id} must be SEALED first (currently {state})")]
    SealRequired { subject_id: String, state: String },

    #[error("GS_434: finality of {subject_id} requires a human review reference")]
    HumanReviewRequired { subject_id: String },

    #[error("GS_435: stale state for {subject_id} (expected version {expected_version}, found {found_version})")]
    StaleState {
        subject_id: String,
        expected_version: u64,
        found_version: u64,
    },

    #[error("GS_436: {subject_id} is sealed; its child set is immutable")]
    SealedImmutable { subject_id: String },
}

impl StateMachineViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IllegalTransition { .. } => "GS_430",
            Self::AlreadyFinal { .. } => "GS_431",
            Self::PrematureFinality { .. } => "GS_432",
            Self::SealRequired { .. } => "GS_433",
            Self::HumanReviewRequired { .. } => "GS_434",
            Self::StaleState { .. } => "GS_435",
            Self::SealedImmutable { .. } => "GS_436",
        }
    }
}

/// Advisory input reaching an authority destination, or an authority claim
/// from the wrong identity.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryViolation {
    #[error("GS_300: {signal} signal may not reach {destination}")]
    AdvisoryToAuthority { signal: String, destination: String },

    #[error("GS_301: no rule for {signal} -> {destination}; blocked by default")]
    UnknownRoute { signal: String, destination: String },

    #[error("GS_302: {signal} signal may not cross from {source_layer} to {target_layer}")]
    LayerCrossing {
        source_layer: String,
        target_layer: String,
        signal: String,
    },

    #[error("GS_303: {claimed} is not the designated authority {expected}")]
    UnauthorizedAuthority { claimed: String, expected: String },
}

impl BoundaryViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AdvisoryToAuthority { .. } => "GS_300",
            Self::UnknownRoute { .. } => "GS_301",
            Self::LayerCrossing { .. } => "GS_302",
            Self::UnauthorizedAuthority { .. } => "GS_303",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "family", content = "detail", rename_all = "snake_case")]
pub enum Violation {
    #[error(transparent)]
    Structural(#[from] StructuralViolation),

    #[error(transparent)]
    Sequencing(#[from] SequencingViolation),

    #[error(transparent)]
    Cryptographic(#[from] CryptographicViolation),

    #[error(transparent)]
    StateMachine(#[from] StateMachineViolation),

    #[error(transparent)]
    Boundary(#[from] BoundaryViolation),
}

impl Violation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Structural(v) => v.code(),
            Self::Sequencing(v) => v.code(),
            Self::Cryptographic(v) => v.code(),
            Self::StateMachine(v) => v.code(),
            Self::Boundary(v) => v.code(),
        }
    }

    pub fn family(&self) -> ViolationFamily {
        match self {
            Self::Structural(_) => ViolationFamily::Structural,
            Self::Sequencing(_) => ViolationFamily::Sequencing,
            Self::Cryptographic(_) => ViolationFamily::Cryptographic,
            Self::StateMachine(_) => ViolationFamily::StateMachine,
            Self::Boundary(_) => ViolationFamily::Boundary,
        }
    }

    pub fn severity(&self) -> Severity {
        self.family().severity()
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Severity::Critical
    }
}
