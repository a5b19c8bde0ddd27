//! Every refusal is on the ledger before the caller hears about it, and a
//! refusal that cannot be recorded becomes a system fault.

use finality_ledger::{LedgerStore, MemoryBackend};
use finality_pdo::{
    ChildStatus, FinalityError, OpdoComposer, OpdoState, Outcome, OutcomeStatus, PdoEngine,
    PdoEngineConfig, ProofSeed,
};
use finality_tests::{detached_child, seed, Harness, ORCHESTRATOR, TASK};
use finality_types::{ActorId, ArtifactId, AuthorityIdentity};
use std::sync::Arc;

fn assert_recorded(h: &Harness, err: &FinalityError) {
    let FinalityError::Rejected { violation, sequence } = err else {
        panic!("expected a recorded rejection, got {err:?}");
    };
    let entry = h
        .ledger
        .get(*sequence)
        .unwrap()
        .expect("entry at the reported sequence");
    assert!(entry.entry_type.is_rejection());
    assert_eq!(entry.payload.violation(), Some(violation));
}

#[test]
fn every_refusal_points_at_its_entry() {
    let h = Harness::in_memory();
    let mut refusals = Vec::new();

    let pdo = h.engine.create(seed("r")).unwrap();
    refusals.push(
        h.engine
            .finalize_outcome(&pdo, Outcome::new(OutcomeStatus::Succeeded, None))
            .unwrap_err(),
    );
    refusals.push(h.engine.child_candidate(&pdo.id, "agent-r", TASK, "BER-r").unwrap_err());

    refusals.push(h.composer.bind_children(TASK, vec![]).unwrap_err());
    refusals.push(
        h.composer
            .bind_children(
                TASK,
                vec![detached_child("u", &[]).with_status(ChildStatus::Pending)],
            )
            .unwrap_err(),
    );
    refusals.push(
        h.composer
            .bind_children(TASK, vec![detached_child("v", &["missing"])])
            .unwrap_err(),
    );

    let a = h.child("a", &[]).unwrap();
    let opdo = h.composer.bind_children(TASK, vec![a]).unwrap();
    refusals.push(
        h.composer
            .request_transition(&opdo, OpdoState::Final, Some(ArtifactId::new("REVIEW-1")))
            .unwrap_err(),
    );

    let codes: Vec<_> = refusals.iter().filter_map(FinalityError::code).collect();
    assert_eq!(
        codes,
        vec!["GS_430", "GS_402", "GS_400", "GS_402", "GS_411", "GS_433"]
    );
    for err in &refusals {
        assert_recorded(&h, err);
    }
    assert_eq!(h.refusals(), refusals.len());
}

#[test]
fn unrecordable_refusal_is_a_system_fault() {
    let ledger = Arc::new(LedgerStore::open(Box::new(MemoryBackend::read_only(vec![]))).unwrap());
    let composer = OpdoComposer::new(Arc::clone(&ledger), AuthorityIdentity::new(ORCHESTRATOR));
    let err = composer.bind_children(TASK, vec![]).unwrap_err();
    assert!(err.is_system_fault());
    assert_eq!(err.code(), Some("GS_400"));

    let engine = PdoEngine::new(
        Arc::clone(&ledger),
        PdoEngineConfig::new(AuthorityIdentity::new("anyone")),
    );
    let blank = ProofSeed::new(" ", "agent-x", seed("x").proof);
    let err = engine.create(blank).unwrap_err();
    assert!(err.is_system_fault(), "{err:?}");
    assert!(ledger.is_empty().unwrap());
}

#[test]
fn refusal_of_an_unknown_pdo_is_still_recorded() {
    let h = Harness::in_memory();
    let other = Harness::in_memory();
    let foreign = other.engine.create(seed("elsewhere")).unwrap();
    let err = h
        .engine
        .reject_pdo(&foreign, &ActorId::new("reviewer"), "not ours")
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_003"));
    assert_recorded(&h, &err);
}
