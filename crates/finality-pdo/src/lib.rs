//! PDO lifecycle engine and O-PDO composer.
//!
//! A PDO (Proof–Decision–Outcome) moves
//! `PENDING → PROOF_VERIFIED → DECISION_RECORDED → OUTCOME_FINALIZED → FINALIZED`,
//! with `REJECTED` reachable from every non-terminal state. Finalized PDOs
//! from different contributors are bound into an O-PDO, committed to by a
//! Merkle composite proof, and driven `DRAFT → SEALED → FINAL`.
//!
//! Invariants:
//! - Only the configured [`AuthorityIdentity`](finality_types::AuthorityIdentity)
//!   can record a decision.
//! - Every transition is appended to the ledger before it becomes visible.
//! - Every refusal is recorded through the rejection recorder before it is
//!   returned.
//! - Terminal states (`FINALIZED`, `REJECTED`, `FINAL`) accept no further
//!   transitions.
//! - Composite proofs are order independent and rebuilt twice before use.

pub mod composer;
pub mod engine;
pub mod error;
pub mod graph;
pub mod merkle;
pub mod opdo;
pub mod pdo;
pub mod proof;
pub mod review;

pub use composer::OpdoComposer;
pub use engine::{PdoEngine, PdoEngineConfig, DEFAULT_ENGINE_ACTOR};
pub use error::{FinalityError, FinalityResult};
pub use graph::find_cycle;
pub use merkle::{
    inclusion_proof, merkle_root, tree_height, verify_inclusion, CompositeProof, InclusionProof,
};
pub use opdo::{
    validate_children, ChildPdo, ChildStatus, OpdoState, OpdoTransition, OrchestratedPdo,
};
pub use pdo::{
    Decision, DecisionKind, Outcome, OutcomeStatus, Pdo, PdoState, PdoTransition, ProofSeed,
};
pub use proof::{EvidenceLink, ProofChain};
pub use review::{ReviewApproval, ReviewPolicy, ReviewTiming, DEFAULT_MINIMUM_REVIEW_LATENCY_MS};
