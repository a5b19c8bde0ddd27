//! Nobody but the configured authority decides, and nothing composes
//! without an orchestrator.

use finality_ledger::{EntryType, LedgerStore};
use finality_pdo::{Decision, DecisionKind, OpdoComposer, PdoState};
use finality_rules::Signal;
use finality_tests::{detached_child, seed, Harness, AUTHORITY, TASK};
use finality_types::{ActorId, AuthorityIdentity};
use std::sync::Arc;

#[test]
fn agent_cannot_approve_its_own_work() {
    let h = Harness::in_memory();
    let pdo = h.engine.create(seed("self")).unwrap();
    let pdo = h.engine.verify_proof(&pdo).unwrap();

    let decision = Decision::new(
        "agent-self",
        DecisionKind::Release,
        Signal::Authoritative,
        "looks good to me",
    );
    let err = h
        .engine
        .record_decision(&pdo, &ActorId::new("agent-self"), decision)
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_303"));

    let current = h.engine.get(&pdo.id).unwrap().unwrap();
    assert_eq!(current.state, PdoState::ProofVerified);
    assert_eq!(h.count(EntryType::BlockEnforced), 1);
}

#[test]
fn claimed_authority_must_match_the_caller() {
    let h = Harness::in_memory();
    let pdo = h.engine.create(seed("claim")).unwrap();
    let pdo = h.engine.verify_proof(&pdo).unwrap();

    // The decision names the authority, but someone else submits it.
    let decision = Decision::new(
        AUTHORITY,
        DecisionKind::Settle,
        Signal::Authoritative,
        "forged",
    );
    let err = h
        .engine
        .record_decision(&pdo, &ActorId::new("agent-claim"), decision)
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_303"));
}

#[test]
fn near_miss_identities_are_not_the_authority() {
    let authority = AuthorityIdentity::new(AUTHORITY);
    assert!(authority.is(&ActorId::new(AUTHORITY)));
    for impostor in [
        "Settlement-Authority",
        "settlement-authority ",
        "settlement-authority-2",
        "settlement",
    ] {
        assert!(!authority.is(&ActorId::new(impostor)), "{impostor}");
    }
}

#[test]
fn composer_without_orchestrator_binds_nothing() {
    let ledger = Arc::new(LedgerStore::in_memory());
    let composer = OpdoComposer::new(Arc::clone(&ledger), AuthorityIdentity::new(""));
    let err = composer
        .bind_children(TASK, vec![detached_child("a", &[])])
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_440"));
    assert!(composer.snapshot().unwrap().is_empty());
    assert_eq!(ledger.by_type(EntryType::OpdoBound).unwrap().len(), 0);
}
