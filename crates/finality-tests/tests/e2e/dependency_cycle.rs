//! Mutually dependent children never bind.

use finality_ledger::EntryType;
use finality_tests::{detached_child, Harness, TASK};
use finality_types::{ArtifactId, SequencingViolation, Violation};

#[test]
fn two_child_cycle_is_rejected() {
    let h = Harness::in_memory();
    let x = h.child("x", &[]).unwrap();
    let y = h.child("y", &[&x.pdo_id]).unwrap();
    let x = x.with_dependencies(vec![y.pdo_id.clone()]);

    let err = h
        .composer
        .bind_children(TASK, vec![x.clone(), y.clone()])
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_410"));

    match err.violation() {
        Some(Violation::Sequencing(SequencingViolation::CycleDetected { path })) => {
            assert!(path.contains(&x.pdo_id.to_string()));
            assert!(path.contains(&y.pdo_id.to_string()));
            assert_eq!(path.first(), path.last());
        }
        other => panic!("unexpected violation {other:?}"),
    }

    assert!(h.composer.snapshot().unwrap().is_empty());
    assert_eq!(h.count(EntryType::OpdoBound), 0);

    let under_task = h.ledger.by_artifact(&ArtifactId::new(TASK)).unwrap();
    let rejection = under_task
        .iter()
        .find(|e| e.entry_type == EntryType::RejectionRecorded)
        .expect("cycle rejection recorded under the task");
    assert_eq!(rejection.payload.violation().map(|v| v.code()), Some("GS_410"));
}

#[test]
fn cycle_through_a_longer_chain_is_rejected() {
    let h = Harness::in_memory();
    let err = h
        .composer
        .bind_children(
            TASK,
            vec![
                detached_child("p", &["s"]),
                detached_child("q", &["p"]),
                detached_child("r", &["q"]),
                detached_child("s", &["r"]),
            ],
        )
        .unwrap_err();
    assert_eq!(err.code(), Some("GS_410"));
}

#[test]
fn acyclic_dependencies_bind() {
    let h = Harness::in_memory();
    let base = h.child("base", &[]).unwrap();
    let mid = h.child("mid", &[&base.pdo_id]).unwrap();
    let top = h.child("top", &[&base.pdo_id, &mid.pdo_id]).unwrap();

    let opdo = h.composer.bind_children(TASK, vec![top, base, mid]).unwrap();
    assert_eq!(opdo.child_pdos.len(), 3);
    assert!(h.composer.seal(&opdo).is_ok());
}
