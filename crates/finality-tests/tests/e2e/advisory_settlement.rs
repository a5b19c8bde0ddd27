//! Advisory input never reaches settlement, however often it is tried.

use finality_ledger::EntryType;
use finality_pdo::{Decision, DecisionKind, PdoState};
use finality_rules::{check_transition, Destination, RuleEngine, Signal, Verdict};
use finality_tests::{seed, Harness, AUTHORITY};
use finality_types::{ActorId, BoundaryViolation};

#[test]
fn advisory_to_settlement_blocks_deterministically() {
    let engine = RuleEngine::new();
    let expected = Verdict::Block {
        violation: BoundaryViolation::AdvisoryToAuthority {
            signal: "ADVISORY".into(),
            destination: "SETTLEMENT".into(),
        },
    };
    for _ in 0..1_000 {
        let verdict = engine.check_transition(Signal::Advisory, Destination::Settlement);
        assert_eq!(verdict, expected);
        assert_eq!(verdict.code(), Some("GS_300"));
    }
    assert_eq!(
        engine.check_transition_named("advisory", "settlement"),
        expected
    );
    assert_eq!(check_transition(Signal::Advisory, Destination::Settlement), expected);
}

#[test]
fn advisory_decision_is_blocked_and_recorded() {
    let h = Harness::in_memory();
    let pdo = h.engine.create(seed("adv")).unwrap();
    let pdo = h.engine.verify_proof(&pdo).unwrap();

    let decision = Decision::new(
        AUTHORITY,
        DecisionKind::Settle,
        Signal::Advisory,
        "drift monitor suggests settling",
    );
    let err = h
        .engine
        .record_decision(&pdo, &ActorId::new(AUTHORITY), decision)
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_300"));
    assert_eq!(h.count(EntryType::BlockEnforced), 1);

    let current = h.engine.get(&pdo.id).unwrap().unwrap();
    assert_eq!(current.state, PdoState::ProofVerified);
    assert!(current.decision.is_none());
}

#[test]
fn every_advisory_route_to_authority_is_blocked() {
    let engine = RuleEngine::new();
    for destination in [
        Destination::AuthorityGrant,
        Destination::Settlement,
        Destination::Release,
        Destination::Closure,
    ] {
        let verdict = engine.check_transition(Signal::Advisory, destination);
        assert!(!verdict.is_allowed(), "{destination} allowed advisory input");
    }
}
