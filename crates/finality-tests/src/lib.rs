//! Shared fixtures for the cross-crate tests under `tests/`.
//!
//! A [`Harness`] wires one ledger, one PDO engine and one composer together
//! the way a deployment would: the composer cross-checks every child against
//! the engine, and the verifier sees both.

use finality_integrity::IntegrityVerifier;
use finality_ledger::{EntryType, LedgerStore};
use finality_pdo::{
    ChildPdo, Decision, DecisionKind, FinalityResult, OpdoComposer, Outcome, OutcomeStatus, Pdo,
    PdoEngine, PdoEngineConfig, ProofChain, ProofSeed,
};
use finality_rules::Signal;
use finality_types::{ActorId, ArtifactId, AuthorityIdentity, ContentHash, PdoId};
use std::sync::Arc;

pub const AUTHORITY: &str = "settlement-authority";
pub const ORCHESTRATOR: &str = "settlement-orchestrator";
pub const TASK: &str = "TASK-COMPOSITE-1";

/// A consistent proof chain for `REQ-<tag>`, submitted by `agent-<tag>`.
pub fn seed(tag: &str) -> ProofSeed {
    ProofSeed::new(
        format!("REQ-{tag}"),
        format!("agent-{tag}"),
        ProofChain::bind(
            (
                ArtifactId::new(format!("REQ-{tag}")),
                ContentHash::hash(format!("request {tag}").as_bytes()),
            ),
            (
                ArtifactId::new(format!("REV-{tag}")),
                ContentHash::hash(format!("review {tag}").as_bytes()),
            ),
            (
                ArtifactId::new(format!("WP-{tag}")),
                ContentHash::hash(format!("work product {tag}").as_bytes()),
            ),
        ),
    )
}

/// A validated child that exists only as a candidate, with no PDO behind it.
pub fn detached_child(tag: &str, deps: &[&str]) -> ChildPdo {
    ChildPdo::new(
        PdoId::new(tag),
        format!("agent-{tag}"),
        TASK,
        ContentHash::hash(tag.as_bytes()),
    )
    .with_validation_record(format!("BER-{tag}"))
    .with_dependencies(deps.iter().map(|d| PdoId::new(*d)).collect())
}

pub struct Harness {
    pub ledger: Arc<LedgerStore>,
    pub engine: Arc<PdoEngine>,
    pub composer: Arc<OpdoComposer>,
}

impl Harness {
    pub fn in_memory() -> Self {
        Self::with_ledger(Arc::new(LedgerStore::in_memory()))
    }

    pub fn with_ledger(ledger: Arc<LedgerStore>) -> Self {
        let engine = Arc::new(PdoEngine::new(
            Arc::clone(&ledger),
            PdoEngineConfig::new(AuthorityIdentity::new(AUTHORITY)),
        ));
        let composer = Arc::new(
            OpdoComposer::new(Arc::clone(&ledger), AuthorityIdentity::new(ORCHESTRATOR))
                .with_pdo_engine(Arc::clone(&engine)),
        );
        Self {
            ledger,
            engine,
            composer,
        }
    }

    pub fn verifier(&self) -> IntegrityVerifier {
        IntegrityVerifier::new(Arc::clone(&self.ledger))
            .with_pdo_engine(Arc::clone(&self.engine))
            .with_composer(Arc::clone(&self.composer))
    }

    /// Drive a fresh PDO all the way to `FINALIZED` on an authoritative basis.
    pub fn finalized_pdo(&self, tag: &str) -> FinalityResult<Pdo> {
        let pdo = self.engine.create(seed(tag))?;
        let pdo = self.engine.verify_proof(&pdo)?;
        let decision = Decision::new(
            AUTHORITY,
            DecisionKind::Settle,
            Signal::Authoritative,
            format!("settle {tag}"),
        );
        let pdo = self
            .engine
            .record_decision(&pdo, &ActorId::new(AUTHORITY), decision)?;
        self.engine
            .finalize_outcome(&pdo, Outcome::new(OutcomeStatus::Succeeded, None))
    }

    /// A finalized PDO turned into a child of [`TASK`].
    pub fn child(&self, tag: &str, deps: &[&PdoId]) -> FinalityResult<ChildPdo> {
        let pdo = self.finalized_pdo(tag)?;
        Ok(self
            .engine
            .child_candidate(&pdo.id, format!("agent-{tag}"), TASK, format!("BER-{tag}"))?
            .with_dependencies(deps.iter().map(|d| (*d).clone()).collect()))
    }

    /// Number of refusal entries (rejections, gate failures, blocks).
    pub fn refusals(&self) -> usize {
        self.ledger
            .with_snapshot(|entries| {
                entries
                    .iter()
                    .filter(|e| e.entry_type.is_rejection())
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn count(&self, entry_type: EntryType) -> usize {
        self.ledger
            .by_type(entry_type)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}
