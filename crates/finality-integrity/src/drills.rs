//! Invariant failure drills.
//!
//! Each drill builds a fresh in-memory ledger, engine and composer, attempts
//! one illegal operation, and checks that it was refused with the expected
//! code and that the refusal left evidence behind.

use finality_ledger::{verify_entries, LedgerStore};
use finality_pdo::{
    ChildPdo, Decision, DecisionKind, FinalityError, FinalityResult, OpdoComposer, Outcome,
    OutcomeStatus, Pdo, PdoEngine, PdoEngineConfig, ProofChain, ProofSeed,
};
use finality_rules::Signal;
use finality_types::{ActorId, ArtifactId, AuthorityIdentity, ContentHash, PdoId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

const DRILL_AUTHORITY: &str = "drill:authority";
const DRILL_ORCHESTRATOR: &str = "drill:orchestrator";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillResult {
    pub name: String,
    pub expected_code: String,
    /// Code the illegal operation was refused with; `None` if it was
    /// accepted.
    pub observed_code: Option<String>,
    /// A rejection entry with the expected code exists (for the tamper
    /// drill: the chain walk located the break).
    pub evidence_found: bool,
    pub passed: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillSuite {
    pub results: Vec<DrillResult>,
}

impl DrillSuite {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> Vec<&DrillResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

impl fmt::Display for DrillSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.results.iter().filter(|r| r.passed).count();
        writeln!(f, "Invariant drills: {passed}/{} passed", self.results.len())?;
        for r in &self.results {
            let mark = if r.passed { "ok  " } else { "FAIL" };
            write!(
                f,
                "  {mark} {:<28} expected {} observed {}",
                r.name,
                r.expected_code,
                r.observed_code.as_deref().unwrap_or("-")
            )?;
            if let Some(err) = &r.error {
                write!(f, " ({err})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct Rig {
    ledger: Arc<LedgerStore>,
    engine: PdoEngine,
    composer: OpdoComposer,
}

impl Rig {
    fn new() -> Self {
        let ledger = Arc::new(LedgerStore::in_memory());
        Self {
            engine: PdoEngine::new(
                Arc::clone(&ledger),
                PdoEngineConfig::new(AuthorityIdentity::new(DRILL_AUTHORITY)),
            ),
            composer: OpdoComposer::new(
                Arc::clone(&ledger),
                AuthorityIdentity::new(DRILL_ORCHESTRATOR),
            ),
            ledger,
        }
    }

    fn seed(tag: &str) -> ProofSeed {
        ProofSeed::new(
            format!("REQ-{tag}"),
            format!("agent-{tag}"),
            ProofChain::bind(
                (ArtifactId::new(format!("REQ-{tag}")), ContentHash::hash(tag.as_bytes())),
                (ArtifactId::new(format!("REV-{tag}")), ContentHash::hash(b"review")),
                (ArtifactId::new(format!("WP-{tag}")), ContentHash::hash(b"work product")),
            ),
        )
    }

    fn verified(&self, tag: &str) -> FinalityResult<Pdo> {
        let pdo = self.engine.create(Self::seed(tag))?;
        self.engine.verify_proof(&pdo)
    }

    fn finalized(&self, tag: &str) -> FinalityResult<Pdo> {
        let pdo = self.verified(tag)?;
        let decision = Decision::new(
            DRILL_AUTHORITY,
            DecisionKind::Settle,
            Signal::Authoritative,
            "drill",
        );
        let pdo = self
            .engine
            .record_decision(&pdo, &ActorId::new(DRILL_AUTHORITY), decision)?;
        self.engine
            .finalize_outcome(&pdo, Outcome::new(OutcomeStatus::Succeeded, None))
    }

    fn child(tag: &str, deps: &[&str]) -> ChildPdo {
        ChildPdo::new(
            PdoId::new(tag),
            format!("agent-{tag}"),
            "TASK-DRILL",
            ContentHash::hash(tag.as_bytes()),
        )
        .with_validation_record(format!("BER-{tag}"))
        .with_dependencies(deps.iter().map(|d| PdoId::new(*d)).collect())
    }

    fn recorded(&self, code: &str) -> bool {
        self.ledger
            .with_snapshot(|entries| {
                entries
                    .iter()
                    .any(|e| e.payload.violation().map(|v| v.code()) == Some(code))
            })
            .unwrap_or(false)
    }
}

/// What the illegal operation did.
struct Observation {
    code: Option<&'static str>,
    evidence_found: bool,
}

/// The refusal code of an operation that must fail. Errors without a code
/// are setup failures and propagate.
fn refusal<T>(result: FinalityResult<T>) -> FinalityResult<Option<&'static str>> {
    match result {
        Ok(_) => Ok(None),
        Err(err) => match err.code() {
            Some(code) => Ok(Some(code)),
            None => Err(err),
        },
    }
}

fn rejection_drill(
    rig: &Rig,
    attempt: impl FnOnce(&Rig) -> FinalityResult<Option<&'static str>>,
) -> FinalityResult<Observation> {
    let code = attempt(rig)?;
    Ok(Observation {
        code,
        evidence_found: code.map_or(false, |c| rig.recorded(c)),
    })
}

fn undefined_transition(rig: &Rig) -> FinalityResult<Observation> {
    rejection_drill(rig, |rig| {
        let pdo = rig.engine.create(Rig::seed("skip"))?;
        refusal(
            rig.engine
                .finalize_outcome(&pdo, Outcome::new(OutcomeStatus::Succeeded, None)),
        )
    })
}

fn terminal_mutation(rig: &Rig) -> FinalityResult<Observation> {
    rejection_drill(rig, |rig| {
        let pdo = rig.finalized("terminal")?;
        refusal(rig.engine.reject_pdo(&pdo, &ActorId::new("drill:operator"), "reopen"))
    })
}

fn finality_without_review(rig: &Rig) -> FinalityResult<Observation> {
    rejection_drill(rig, |rig| {
        let opdo = rig
            .composer
            .bind_children("TASK-DRILL", vec![Rig::child("a", &[]), Rig::child("b", &["a"])])?;
        let sealed = rig.composer.seal(&opdo)?;
        refusal(rig.composer.finalize(&sealed, None))
    })
}

fn invalid_authority(rig: &Rig) -> FinalityResult<Observation> {
    rejection_drill(rig, |rig| {
        let pdo = rig.verified("impostor")?;
        let decision = Decision::new(
            "agent-impostor",
            DecisionKind::Release,
            Signal::Authoritative,
            "self-approval",
        );
        refusal(
            rig.engine
                .record_decision(&pdo, &ActorId::new("agent-impostor"), decision),
        )
    })
}

fn advisory_escalation(rig: &Rig) -> FinalityResult<Observation> {
    rejection_drill(rig, |rig| {
        let pdo = rig.verified("advisory")?;
        let decision = Decision::new(
            DRILL_AUTHORITY,
            DecisionKind::Settle,
            Signal::Advisory,
            "model suggests settling",
        );
        refusal(
            rig.engine
                .record_decision(&pdo, &ActorId::new(DRILL_AUTHORITY), decision),
        )
    })
}

fn dependency_cycle(rig: &Rig) -> FinalityResult<Observation> {
    rejection_drill(rig, |rig| {
        refusal(rig.composer.bind_children(
            "TASK-DRILL",
            vec![Rig::child("x", &["y"]), Rig::child("y", &["x"])],
        ))
    })
}

fn ledger_tamper(rig: &Rig) -> FinalityResult<Observation> {
    rig.finalized("tamper")?;
    let mut entries = rig.ledger.entries()?;
    let Some(target) = entries.get_mut(1) else {
        return Ok(Observation {
            code: None,
            evidence_found: false,
        });
    };
    target.actor_id = ActorId::new("mallory");
    let chain = verify_entries(&entries)?;
    Ok(Observation {
        code: chain.violations.first().map(|v| v.code()),
        evidence_found: chain.first_break == Some(1),
    })
}

type Drill = fn(&Rig) -> FinalityResult<Observation>;

const DRILLS: &[(&str, &str, Drill)] = &[
    ("undefined_transition", "GS_430", undefined_transition),
    ("terminal_mutation", "GS_431", terminal_mutation),
    ("finality_without_review", "GS_434", finality_without_review),
    ("invalid_authority", "GS_303", invalid_authority),
    ("advisory_escalation", "GS_300", advisory_escalation),
    ("dependency_cycle", "GS_410", dependency_cycle),
    ("ledger_tamper", "GS_020", ledger_tamper),
];

/// Run every drill against its own fresh rig.
pub fn run_drills() -> DrillSuite {
    let results = DRILLS
        .iter()
        .map(|(name, expected, drill)| {
            let outcome: Result<Observation, FinalityError> = drill(&Rig::new());
            let result = match outcome {
                Ok(obs) => DrillResult {
                    name: name.to_string(),
                    expected_code: expected.to_string(),
                    observed_code: obs.code.map(str::to_string),
                    evidence_found: obs.evidence_found,
                    passed: obs.code == Some(*expected) && obs.evidence_found,
                    error: None,
                },
                Err(err) => DrillResult {
                    name: name.to_string(),
                    expected_code: expected.to_string(),
                    observed_code: None,
                    evidence_found: false,
                    passed: false,
                    error: Some(err.to_string()),
                },
            };
            if result.passed {
                info!(drill = *name, code = *expected, "drill passed");
            } else {
                warn!(
                    drill = *name,
                    expected = *expected,
                    observed = ?result.observed_code,
                    "drill failed"
                );
            }
            result
        })
        .collect();
    DrillSuite { results }
}
