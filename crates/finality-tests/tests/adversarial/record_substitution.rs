//! Records edited after finality are caught by re-deriving their proofs
//! against the ledger.

use finality_integrity::{AuditCheck, Verdict};
use finality_pdo::{OrchestratedPdo, PdoState};
use finality_tests::{Harness, TASK};
use finality_types::{ArtifactId, ContentHash};

fn finalized_opdo(h: &Harness) -> OrchestratedPdo {
    let children = vec![
        h.child("s1", &[]).unwrap(),
        h.child("s2", &[]).unwrap(),
        h.child("s3", &[]).unwrap(),
    ];
    let opdo = h.composer.bind_children(TASK, children).unwrap();
    let sealed = h.composer.seal(&opdo).unwrap();
    h.composer
        .finalize(&sealed, Some(ArtifactId::new("REVIEW-S")))
        .unwrap()
}

#[test]
fn honest_records_verify() {
    let h = Harness::in_memory();
    finalized_opdo(&h);
    let report = h.verifier().audit().unwrap();
    assert_eq!(report.verdict, Verdict::IntegrityVerified, "{:?}", report.findings);
}

#[test]
fn swapped_child_content_breaks_the_root() {
    let h = Harness::in_memory();
    let opdo = finalized_opdo(&h);
    let pdos = h.engine.snapshot().unwrap();

    let mut forged = opdo.clone();
    forged.child_pdos[1].content_hash = ContentHash::hash(b"substituted work");

    let report = h.verifier().audit_records(&pdos, &[forged]).unwrap();
    assert_eq!(report.verdict, Verdict::TamperingDetected);
    assert_eq!(report.codes(), vec!["GS_421"]);
    let finding = report.findings_for(AuditCheck::CompositeProof).next().unwrap();
    assert_eq!(finding.subject, opdo.id.to_string());
}

#[test]
fn swapped_contributor_breaks_the_root() {
    let h = Harness::in_memory();
    let opdo = finalized_opdo(&h);
    let pdos = h.engine.snapshot().unwrap();

    let mut forged = opdo;
    forged.child_pdos[0].contributor = "agent-impostor".into();

    let report = h.verifier().audit_records(&pdos, &[forged]).unwrap();
    assert_eq!(report.verdict, Verdict::TamperingDetected);
    assert!(report.codes().contains(&"GS_421"));
}

#[test]
fn swapped_review_reference_breaks_the_final_hash() {
    let h = Harness::in_memory();
    let opdo = finalized_opdo(&h);
    let pdos = h.engine.snapshot().unwrap();

    let mut forged = opdo;
    forged.human_review_ref = Some(ArtifactId::new("REVIEW-NEVER-HAPPENED"));

    let report = h.verifier().audit_records(&pdos, &[forged]).unwrap();
    assert_eq!(report.verdict, Verdict::TamperingDetected);
    assert_eq!(report.codes(), vec!["GS_443"]);
}

#[test]
fn stripped_review_reference_is_premature_finality() {
    let h = Harness::in_memory();
    let opdo = finalized_opdo(&h);
    let pdos = h.engine.snapshot().unwrap();

    let mut forged = opdo;
    forged.human_review_ref = None;

    let report = h.verifier().audit_records(&pdos, &[forged]).unwrap();
    assert_eq!(report.verdict, Verdict::ValidationFailed);
    assert_eq!(report.codes(), vec!["GS_434"]);
}

#[test]
fn foreign_record_has_no_history_here() {
    let home = Harness::in_memory();
    home.finalized_pdo("home").unwrap();

    // Finalized somewhere else, then presented to this ledger.
    let elsewhere = Harness::in_memory();
    let foreign = elsewhere.finalized_pdo("foreign").unwrap();
    assert_eq!(foreign.state, PdoState::Finalized);

    let mut pdos = home.engine.snapshot().unwrap();
    pdos.push(foreign);

    let report = home.verifier().audit_records(&pdos, &[]).unwrap();
    assert_eq!(report.verdict, Verdict::ValidationFailed);
    let codes = report.codes();
    assert!(codes.contains(&"GS_012"));
    assert!(codes.contains(&"GS_013"));
    assert_eq!(
        report
            .findings_for(AuditCheck::LifecycleCompleteness)
            .count(),
        PdoState::Finalized.required_path().len()
    );
}
