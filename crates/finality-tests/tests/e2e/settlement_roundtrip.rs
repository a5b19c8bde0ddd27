//! Full path on a file-backed ledger: PDOs finalize, bind into an O-PDO,
//! seal, finalize under review, and the whole store audits clean before and
//! after a reopen.

use finality_integrity::{IntegrityVerifier, Verdict};
use finality_ledger::{EntryType, LedgerStore};
use finality_pdo::{OpdoState, PdoState};
use finality_tests::{seed, Harness, TASK};
use finality_types::{ActorId, ArtifactId};
use std::sync::Arc;

#[test]
fn settlement_survives_reopen_and_audits_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let ledger = Arc::new(LedgerStore::open_file(&path, false, true).unwrap());
    let h = Harness::with_ledger(Arc::clone(&ledger));

    let a = h.child("alpha", &[]).unwrap();
    let b = h.child("beta", &[&a.pdo_id]).unwrap();
    let c = h.child("gamma", &[&a.pdo_id]).unwrap();

    // A withdrawn PDO stays on the record.
    let withdrawn = h.engine.create(seed("withdrawn")).unwrap();
    let withdrawn = h
        .engine
        .reject_pdo(&withdrawn, &ActorId::new("agent-withdrawn"), "superseded")
        .unwrap();
    assert_eq!(withdrawn.state, PdoState::Rejected);
    assert_eq!(withdrawn.rejection.as_ref().map(|v| v.code()), Some("GS_009"));

    let opdo = h.composer.bind_children(TASK, vec![a, b, c]).unwrap();
    let sealed = h.composer.seal(&opdo).unwrap();
    let finalized = h
        .composer
        .finalize(&sealed, Some(ArtifactId::new("REVIEW-1")))
        .unwrap();
    assert_eq!(finalized.state, OpdoState::Final);
    assert_eq!(
        finalized.state_history.iter().map(|t| t.to).collect::<Vec<_>>(),
        vec![OpdoState::Draft, OpdoState::Sealed, OpdoState::Final]
    );

    let pdos = h.engine.snapshot().unwrap();
    assert_eq!(pdos.len(), 4);
    assert_eq!(
        pdos.iter().filter(|p| p.state == PdoState::Finalized).count(),
        3
    );
    assert_eq!(
        pdos.iter().filter(|p| p.state == PdoState::Rejected).count(),
        1
    );

    let report = h.verifier().audit().unwrap();
    assert_eq!(report.verdict, Verdict::IntegrityVerified, "{report}");
    assert_eq!(report.pdos_checked, 4);
    assert_eq!(report.opdos_checked, 1);
    let again = h.verifier().audit().unwrap();
    assert_eq!(report.fingerprint().unwrap(), again.fingerprint().unwrap());

    let head = ledger.head_hash().unwrap();
    let len = ledger.len().unwrap();
    drop(h);
    drop(ledger);

    let reopened = Arc::new(LedgerStore::open_file(&path, true, true).unwrap());
    assert_eq!(reopened.len().unwrap(), len);
    assert_eq!(reopened.head_hash().unwrap(), head);
    assert_eq!(reopened.by_type(EntryType::FinalitySealed).unwrap().len(), 1);
    assert_eq!(reopened.by_type(EntryType::FinalityFinalized).unwrap().len(), 1);

    let replay = IntegrityVerifier::new(reopened)
        .audit_records(&pdos, &[finalized])
        .unwrap();
    assert!(replay.is_verified(), "{replay}");
    assert_eq!(replay.chain, report.chain);
}

#[test]
fn summary_report_reflects_the_lifecycle() {
    let h = Harness::in_memory();
    let a = h.child("one", &[]).unwrap();
    let b = h.child("two", &[]).unwrap();
    let opdo = h.composer.bind_children(TASK, vec![a, b]).unwrap();
    let sealed = h.composer.seal(&opdo).unwrap();
    h.composer.finalize(&sealed, None).unwrap_err();
    h.composer
        .finalize(&sealed, Some(ArtifactId::new("REVIEW-2")))
        .unwrap();

    let summary = h.ledger.report().unwrap();
    assert_eq!(summary.total_entries, h.ledger.len().unwrap());
    assert_eq!(summary.rejections, 1);
    assert_eq!(summary.finalized, 1);
    assert_eq!(summary.head_hash, h.ledger.head_hash().unwrap());
    // Bound, sealed, the refused finalize, finalized.
    assert_eq!(summary.by_actor.get(finality_tests::ORCHESTRATOR), Some(&4));
}
