use crate::error::IntegrityResult;
use crate::report::{AuditCheck, Finding, IntegrityReport};
use finality_ledger::{verify_entries, ArtifactType, LedgerEntry, LedgerStore};
use finality_pdo::{
    find_cycle, merkle_root, ChildStatus, OpdoComposer, OpdoState, OrchestratedPdo, Pdo,
    PdoEngine, PdoState,
};
use finality_types::{
    ArtifactId, ContentHash, CryptographicViolation, SequencingViolation, StateMachineViolation,
    StructuralViolation, Violation,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only auditor. Reports, never repairs.
pub struct IntegrityVerifier {
    ledger: Arc<LedgerStore>,
    pdo_engine: Option<Arc<PdoEngine>>,
    composer: Option<Arc<OpdoComposer>>,
}

impl IntegrityVerifier {
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        Self {
            ledger,
            pdo_engine: None,
            composer: None,
        }
    }

    pub fn with_pdo_engine(mut self, engine: Arc<PdoEngine>) -> Self {
        self.pdo_engine = Some(engine);
        self
    }

    pub fn with_composer(mut self, composer: Arc<OpdoComposer>) -> Self {
        self.composer = Some(composer);
        self
    }

    /// Audit the ledger and every record held by the attached engine and
    /// composer.
    pub fn audit(&self) -> IntegrityResult<IntegrityReport> {
        let pdos = match &self.pdo_engine {
            Some(engine) => engine.snapshot()?,
            None => Vec::new(),
        };
        let opdos = match &self.composer {
            Some(composer) => composer.snapshot()?,
            None => Vec::new(),
        };
        self.audit_records(&pdos, &opdos)
    }

    /// Audit the ledger against an explicit set of records.
    pub fn audit_records(
        &self,
        pdos: &[Pdo],
        opdos: &[OrchestratedPdo],
    ) -> IntegrityResult<IntegrityReport> {
        let entries = self.ledger.entries()?;
        let chain = verify_entries(&entries)?;
        let mut findings: Vec<Finding> = chain
            .violations
            .iter()
            .map(|v| Finding {
                check: AuditCheck::HashChain,
                subject: chain_subject(v),
                violation: v.clone(),
            })
            .collect();

        let intact = match chain.first_break {
            Some(first_break) => &entries[..entries
                .iter()
                .position(|e| e.sequence >= first_break)
                .unwrap_or(entries.len())],
            None => &entries[..],
        };

        for opdo in opdos {
            for violation in check_composite(opdo)? {
                findings.push(Finding {
                    check: AuditCheck::CompositeProof,
                    subject: opdo.id.to_string(),
                    violation,
                });
            }
        }

        for pdo in pdos {
            let subject = ArtifactId::from(&pdo.id);
            let path: Vec<&str> = pdo.state.required_path().iter().map(|s| s.as_str()).collect();
            lifecycle_findings(
                &mut findings,
                &entries,
                &subject,
                ArtifactType::Pdo,
                pdo.state.as_str(),
                &path,
            );
            if pdo.state != PdoState::Pending && !reachable(intact, &subject) {
                findings.push(orphan(&subject));
            }
        }

        for opdo in opdos {
            let subject = ArtifactId::from(&opdo.id);
            let path: Vec<&str> = opdo.state.required_path().iter().map(|s| s.as_str()).collect();
            lifecycle_findings(
                &mut findings,
                &entries,
                &subject,
                ArtifactType::Opdo,
                opdo.state.as_str(),
                &path,
            );
            if !reachable(intact, &subject) {
                findings.push(orphan(&subject));
            }
        }

        let report = IntegrityReport::new(entries.len(), chain, pdos.len(), opdos.len(), findings);
        if report.is_verified() {
            info!(
                entries = report.total_entries,
                pdos = report.pdos_checked,
                opdos = report.opdos_checked,
                "integrity verified"
            );
        } else {
            warn!(
                verdict = %report.verdict,
                findings = report.findings.len(),
                first_break = ?report.chain.first_break,
                "integrity audit found violations"
            );
        }
        Ok(report)
    }
}

fn chain_subject(violation: &Violation) -> String {
    let sequence = match violation {
        Violation::Cryptographic(CryptographicViolation::HashMismatch { sequence, .. })
        | Violation::Cryptographic(CryptographicViolation::ChainBroken { sequence, .. })
        | Violation::Sequencing(SequencingViolation::DuplicateSequence { sequence }) => *sequence,
        Violation::Sequencing(SequencingViolation::SequenceGap { found, .. }) => *found,
        _ => return "ledger".into(),
    };
    format!("sequence {sequence}")
}

/// Re-derive the composite proof and final hash from the bound children.
fn check_composite(opdo: &OrchestratedPdo) -> IntegrityResult<Vec<Violation>> {
    let subject_id = opdo.id.to_string();
    let mut violations = Vec::new();

    for child in &opdo.child_pdos {
        if child.status != ChildStatus::Validated {
            violations.push(
                StructuralViolation::ChildNotValidated {
                    child_id: child.pdo_id.to_string(),
                    status: child.status.as_str().into(),
                }
                .into(),
            );
        }
    }
    if let Some(path) = find_cycle(&opdo.child_pdos) {
        violations.push(
            SequencingViolation::CycleDetected {
                path: path.iter().map(ToString::to_string).collect(),
            }
            .into(),
        );
    }

    match &opdo.composite_proof {
        Some(proof) => {
            let computed = merkle_root(&opdo.leaf_hashes()?).unwrap_or_else(ContentHash::zero);
            if computed != proof.merkle_root {
                violations.push(
                    CryptographicViolation::MerkleRootMismatch {
                        subject_id: subject_id.clone(),
                        stored: proof.merkle_root,
                        computed,
                    }
                    .into(),
                );
            }
        }
        None if opdo.state != OpdoState::Draft => violations.push(
            StateMachineViolation::PrematureFinality {
                subject_id: subject_id.clone(),
                reason: format!("{} without composite proof", opdo.state),
            }
            .into(),
        ),
        None => {}
    }

    if opdo.state == OpdoState::Final {
        match (&opdo.human_review_ref, opdo.final_hash) {
            (Some(review_ref), Some(stored)) => {
                if let Some(computed) = opdo.compute_final_hash(review_ref)? {
                    if computed != stored {
                        violations.push(
                            CryptographicViolation::FinalHashMismatch {
                                subject_id,
                                stored,
                                computed,
                            }
                            .into(),
                        );
                    }
                }
            }
            (None, _) => violations.push(
                StateMachineViolation::HumanReviewRequired { subject_id }.into(),
            ),
            (Some(_), None) => violations.push(
                StateMachineViolation::PrematureFinality {
                    subject_id,
                    reason: "FINAL without final hash".into(),
                }
                .into(),
            ),
        }
    }
    Ok(violations)
}

/// Every state on the record's required path needs its own transition
/// entry.
fn lifecycle_findings(
    findings: &mut Vec<Finding>,
    entries: &[LedgerEntry],
    subject: &ArtifactId,
    artifact_type: ArtifactType,
    current: &str,
    path: &[&str],
) {
    for state in path {
        let recorded = entries.iter().any(|e| {
            &e.artifact_id == subject
                && e.artifact_type == artifact_type
                && e.payload.transition_target() == Some(*state)
        });
        if !recorded {
            findings.push(Finding {
                check: AuditCheck::LifecycleCompleteness,
                subject: subject.to_string(),
                violation: SequencingViolation::MissingPriorRecord {
                    subject_id: subject.to_string(),
                    current: current.to_string(),
                    missing: state.to_string(),
                }
                .into(),
            });
        }
    }
}

fn reachable(intact: &[LedgerEntry], subject: &ArtifactId) -> bool {
    intact.iter().any(|e| e.references(subject))
}

fn orphan(subject: &ArtifactId) -> Finding {
    Finding {
        check: AuditCheck::Reachability,
        subject: subject.to_string(),
        violation: SequencingViolation::OrphanedRecord {
            subject_id: subject.to_string(),
        }
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Verdict;
    use finality_ledger::{EntryDraft, EntryPayload, EntryType, MemoryBackend};
    use finality_pdo::{
        ChildPdo, Decision, DecisionKind, Outcome, OutcomeStatus, PdoEngineConfig, ProofChain,
        ProofSeed,
    };
    use finality_rules::Signal;
    use finality_types::{AuthorityIdentity, PdoId};

    const AUTHORITY: &str = "authority:settlement";

    struct Harness {
        ledger: Arc<LedgerStore>,
        engine: Arc<PdoEngine>,
        composer: Arc<OpdoComposer>,
    }

    impl Harness {
        fn new() -> Self {
            let ledger = Arc::new(LedgerStore::in_memory());
            let engine = Arc::new(PdoEngine::new(
                Arc::clone(&ledger),
                PdoEngineConfig::new(AuthorityIdentity::new(AUTHORITY)),
            ));
            let composer = Arc::new(OpdoComposer::new(
                Arc::clone(&ledger),
                AuthorityIdentity::new("orchestrator"),
            ));
            Self {
                ledger,
                engine,
                composer,
            }
        }

        fn verifier(&self) -> IntegrityVerifier {
            IntegrityVerifier::new(Arc::clone(&self.ledger))
                .with_pdo_engine(Arc::clone(&self.engine))
                .with_composer(Arc::clone(&self.composer))
        }

        fn finalized_pdo(&self, n: u8) -> Pdo {
            let proof = ProofChain::bind(
                (ArtifactId::new(format!("REQ-{n}")), ContentHash::hash(&[n, 1])),
                (ArtifactId::new(format!("REV-{n}")), ContentHash::hash(&[n, 2])),
                (ArtifactId::new(format!("WP-{n}")), ContentHash::hash(&[n, 3])),
            );
            let pdo = self
                .engine
                .create(ProofSeed::new(format!("REQ-{n}"), format!("agent-{n}"), proof))
                .unwrap();
            let pdo = self.engine.verify_proof(&pdo).unwrap();
            let decision = Decision::new(AUTHORITY, DecisionKind::Settle, Signal::Authoritative, "ok");
            let pdo = self
                .engine
                .record_decision(&pdo, &finality_types::ActorId::new(AUTHORITY), decision)
                .unwrap();
            self.engine
                .finalize_outcome(&pdo, Outcome::new(OutcomeStatus::Succeeded, None))
                .unwrap()
        }

        fn final_opdo(&self) -> OrchestratedPdo {
            let children: Vec<ChildPdo> = (1..=3)
                .map(|n| {
                    let pdo = self.finalized_pdo(n);
                    self.engine
                        .child_candidate(&pdo.id, format!("agent-{n}"), "TASK-9", format!("BER-{n}"))
                        .unwrap()
                })
                .collect();
            let opdo = self.composer.bind_children("TASK-9", children).unwrap();
            let sealed = self.composer.seal(&opdo).unwrap();
            self.composer
                .finalize(&sealed, Some(ArtifactId::new("HR-1")))
                .unwrap()
        }
    }

    #[test]
    fn clean_store_verifies_and_is_reproducible() {
        let h = Harness::new();
        h.final_opdo();
        let first = h.verifier().audit().unwrap();
        assert_eq!(first.verdict, Verdict::IntegrityVerified, "{first}");
        assert_eq!(first.pdos_checked, 3);
        assert_eq!(first.opdos_checked, 1);

        let second = h.verifier().audit().unwrap();
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn tampered_child_breaks_the_root() {
        let h = Harness::new();
        let mut opdo = h.final_opdo();
        opdo.child_pdos[1].source_task = ArtifactId::new("TASK-FORGED");
        let report = h.verifier().audit_records(&[], &[opdo]).unwrap();
        assert_eq!(report.verdict, Verdict::TamperingDetected);
        assert!(report.codes().contains(&"GS_421"));
    }

    #[test]
    fn swapped_review_ref_breaks_final_hash() {
        let h = Harness::new();
        let mut opdo = h.final_opdo();
        opdo.human_review_ref = Some(ArtifactId::new("HR-FORGED"));
        let report = h.verifier().audit_records(&[], &[opdo]).unwrap();
        assert_eq!(report.codes(), vec!["GS_443"]);
    }

    #[test]
    fn skipped_step_is_a_missing_prior_record() {
        let h = Harness::new();
        let mut pdo = h.finalized_pdo(1);
        // A record claiming FINALIZED for an id the ledger never saw move.
        pdo.id = PdoId::new("PDO-ghost");
        let report = h.verifier().audit_records(&[pdo], &[]).unwrap();
        assert_eq!(report.verdict, Verdict::ValidationFailed);
        assert_eq!(report.findings_for(AuditCheck::LifecycleCompleteness).count(), 5);
        assert_eq!(report.findings_for(AuditCheck::Reachability).count(), 1);
        assert!(report.codes().contains(&"GS_013"));
    }

    #[test]
    fn ledger_tamper_is_reported_with_location() {
        let h = Harness::new();
        h.finalized_pdo(1);
        let mut entries = h.ledger.entries().unwrap();
        entries[2].actor_id = finality_types::ActorId::new("mallory");
        let tampered = Arc::new(LedgerStore::open(Box::new(MemoryBackend::read_only(entries))).unwrap());
        let report = IntegrityVerifier::new(tampered).audit().unwrap();
        assert_eq!(report.verdict, Verdict::TamperingDetected);
        assert_eq!(report.chain.first_break, Some(2));
        let subjects: Vec<_> = report
            .findings_for(AuditCheck::HashChain)
            .map(|f| (f.subject.as_str(), f.violation.code()))
            .collect();
        assert_eq!(
            subjects,
            vec![("sequence 2", "GS_020"), ("sequence 3", "GS_021")]
        );
    }

    #[test]
    fn records_after_the_break_are_orphaned() {
        let h = Harness::new();
        h.ledger
            .append(EntryDraft::new(
                EntryType::ArtifactIssued,
                "agent-0",
                "REQ-0",
                ArtifactType::Request,
                EntryPayload::artifact(None),
            ))
            .unwrap();
        let pdo = h.finalized_pdo(1);
        let mut entries = h.ledger.entries().unwrap();
        entries[0].artifact_id = ArtifactId::new("REQ-X");
        let tampered = Arc::new(LedgerStore::open(Box::new(MemoryBackend::read_only(entries))).unwrap());
        let report = IntegrityVerifier::new(tampered)
            .audit_records(&[pdo.clone()], &[])
            .unwrap();
        assert!(report
            .findings_for(AuditCheck::Reachability)
            .any(|f| f.subject == pdo.id.to_string()));
    }
}
