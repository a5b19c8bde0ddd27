//! Three independent children seal cleanly, but finality without a human
//! review reference is refused and recorded.

use finality_ledger::EntryType;
use finality_pdo::OpdoState;
use finality_tests::{Harness, TASK};
use finality_types::ArtifactId;

#[test]
fn finalize_without_review_is_refused() {
    let h = Harness::in_memory();
    let children = vec![
        h.child("a", &[]).unwrap(),
        h.child("b", &[]).unwrap(),
        h.child("c", &[]).unwrap(),
    ];

    let opdo = h.composer.bind_children(TASK, children).unwrap();
    assert_eq!(opdo.state, OpdoState::Draft);

    let sealed = h.composer.seal(&opdo).unwrap();
    assert_eq!(sealed.state, OpdoState::Sealed);
    let proof = sealed.composite_proof.as_ref().unwrap();
    assert_eq!(proof.leaf_hashes.len(), 3);
    assert_eq!(proof.tree_height, 2);

    let refusals_before = h.refusals();
    let err = h.composer.finalize(&sealed, None).unwrap_err();
    assert_eq!(err.code(), Some("GS_434"));
    assert_eq!(h.refusals(), refusals_before + 1);

    // A blank reference is no reference.
    let err = h
        .composer
        .finalize(&sealed, Some(ArtifactId::new("  ")))
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_434"));

    let current = h.composer.get(&opdo.id).unwrap().unwrap();
    assert_eq!(current.state, OpdoState::Sealed);
    assert!(current.final_hash.is_none());
    assert_eq!(h.count(EntryType::FinalityFinalized), 0);
}

#[test]
fn reviewed_finality_is_irreversible() {
    let h = Harness::in_memory();
    let children = vec![h.child("a", &[]).unwrap(), h.child("b", &[]).unwrap()];
    let opdo = h.composer.bind_children(TASK, children).unwrap();
    let sealed = h.composer.seal(&opdo).unwrap();

    let review = ArtifactId::new("REVIEW-77");
    let finalized = h.composer.finalize(&sealed, Some(review.clone())).unwrap();
    assert_eq!(finalized.state, OpdoState::Final);
    assert_eq!(finalized.human_review_ref, Some(review.clone()));
    assert_eq!(
        finalized.final_hash,
        finalized.compute_final_hash(&review).unwrap()
    );

    let err = h
        .composer
        .finalize(&finalized, Some(ArtifactId::new("REVIEW-78")))
        .unwrap_err();
    assert!(matches!(err.code(), Some("GS_431") | Some("GS_433")));

    let err = h
        .composer
        .request_transition(&finalized, OpdoState::Draft, None)
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_431"));

    let stored = h.composer.get(&opdo.id).unwrap().unwrap();
    assert_eq!(stored.state, OpdoState::Final);
    assert_eq!(stored.final_hash, finalized.final_hash);
}
