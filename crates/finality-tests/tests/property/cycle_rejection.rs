//! Property tests: a dependency cycle of any length, anywhere in the child
//! set, keeps the set from binding.

use finality_ledger::EntryType;
use finality_pdo::{find_cycle, ChildPdo};
use finality_tests::{detached_child, Harness, TASK};
use finality_types::{ArtifactId, SequencingViolation, Violation};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn name(i: usize) -> String {
    format!("child-{i}")
}

/// `(total, cycle_start, cycle_len)` with the cycle inside the set.
fn arb_layout() -> impl Strategy<Value = (usize, usize, usize)> {
    (2usize..12)
        .prop_flat_map(|total| (Just(total), 2usize..=total))
        .prop_flat_map(|(total, len)| (Just(total), 0..=total - len, Just(len)))
}

/// Children outside the cycle depend on their predecessor; cycle members
/// depend on the next member, wrapping around.
fn children(total: usize, start: usize, len: usize) -> Vec<ChildPdo> {
    (0..total)
        .map(|i| {
            let dependency = if (start..start + len).contains(&i) {
                Some(if i + 1 == start + len { start } else { i + 1 })
            } else if i > 0 {
                Some(i - 1)
            } else {
                None
            };
            let deps: Vec<String> = dependency.map(name).into_iter().collect();
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            detached_child(&name(i), &deps)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// The reported path is closed and runs only through cycle members.
    #[test]
    fn cycle_is_found_and_closed((total, start, len) in arb_layout()) {
        let set = children(total, start, len);
        let path = find_cycle(&set).expect("cycle present");

        prop_assert_eq!(path.len(), len + 1);
        prop_assert_eq!(path.first(), path.last());
        let members: BTreeSet<String> = (start..start + len).map(name).collect();
        for id in &path {
            prop_assert!(members.contains(&id.to_string()), "{} is not on the cycle", id);
        }
    }

    /// Binding refuses the set, records the refusal under the task and
    /// creates nothing.
    #[test]
    fn cyclic_sets_never_bind((total, start, len) in arb_layout()) {
        let h = Harness::in_memory();
        let err = h.composer.bind_children(TASK, children(total, start, len)).unwrap_err();

        prop_assert_eq!(err.code(), Some("GS_410"));
        let is_cycle = matches!(
            err.violation(),
            Some(Violation::Sequencing(SequencingViolation::CycleDetected { .. }))
        );
        prop_assert!(is_cycle);
        prop_assert!(h.composer.snapshot().unwrap().is_empty());
        prop_assert_eq!(h.count(EntryType::OpdoBound), 0);
        prop_assert_eq!(h.refusals(), 1);

        let under_task = h.ledger.by_artifact(&ArtifactId::new(TASK)).unwrap();
        prop_assert_eq!(under_task.len(), 1);
        prop_assert_eq!(
            under_task[0].payload.violation().map(|v| v.code()),
            Some("GS_410")
        );
    }

    /// Without the back edge the same layout is a chain and has no cycle.
    #[test]
    fn breaking_the_back_edge_removes_the_cycle((total, start, len) in arb_layout()) {
        let mut set = children(total, start, len);
        set[start + len - 1].dependencies.clear();
        prop_assert!(find_cycle(&set).is_none());
    }
}
