//! Property tests: any sequence of appends yields a valid chain, and any
//! single mutated entry is located exactly.

use finality_ledger::{
    ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerStore, MemoryBackend,
};
use finality_types::{CryptographicViolation, Violation};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_entry_type() -> impl Strategy<Value = EntryType> {
    prop_oneof![
        Just(EntryType::ArtifactIssued),
        Just(EntryType::ArtifactExecuted),
    ]
}

fn arb_artifact_type() -> impl Strategy<Value = ArtifactType> {
    prop_oneof![
        Just(ArtifactType::Request),
        Just(ArtifactType::Review),
        Just(ArtifactType::WorkProduct),
        Just(ArtifactType::Correction),
        Just(ArtifactType::Closure),
    ]
}

fn arb_draft() -> impl Strategy<Value = EntryDraft> {
    (
        arb_entry_type(),
        "[a-z]{3,10}",
        "[A-Z]{2,4}-[0-9]{1,4}",
        arb_artifact_type(),
        proptest::option::of("[a-z ]{0,30}"),
        proptest::option::of("[A-Z]{2,4}-[0-9]{1,4}"),
    )
        .prop_map(|(entry_type, actor, artifact, artifact_type, notes, parent)| {
            let draft = EntryDraft::new(
                entry_type,
                format!("agent-{actor}"),
                artifact,
                artifact_type,
                EntryPayload::artifact(notes),
            );
            match parent {
                Some(parent) => draft.with_parent(parent),
                None => draft,
            }
        })
}

#[derive(Clone, Copy, Debug)]
enum Mutation {
    Actor,
    Payload,
    ArtifactType,
}

fn arb_mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        Just(Mutation::Actor),
        Just(Mutation::Payload),
        Just(Mutation::ArtifactType),
    ]
}

fn filled(drafts: Vec<EntryDraft>) -> LedgerStore {
    let store = LedgerStore::in_memory();
    for draft in drafts {
        store.append(draft).unwrap();
    }
    store
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Appends produce contiguous sequences, linked hashes and a valid chain.
    #[test]
    fn appends_always_verify(drafts in proptest::collection::vec(arb_draft(), 1..40)) {
        let count = drafts.len();
        let store = filled(drafts);
        let entries = store.entries().unwrap();

        prop_assert_eq!(entries.len(), count);
        for (i, entry) in entries.iter().enumerate() {
            prop_assert_eq!(entry.sequence, i as u64);
            prop_assert_eq!(entry.compute_hash().unwrap(), entry.entry_hash);
            if i > 0 {
                prop_assert_eq!(entry.prev_hash, entries[i - 1].entry_hash);
            }
        }

        let report = store.verify_chain().unwrap();
        prop_assert!(report.valid);
        prop_assert!(report.violations.is_empty());
        prop_assert_eq!(report.entries_checked, count);
        prop_assert_eq!(report.head_hash, Some(entries[count - 1].entry_hash));
    }

    /// Mutating any one committed entry breaks the chain at that entry.
    #[test]
    fn any_mutation_is_located(
        drafts in proptest::collection::vec(arb_draft(), 1..40),
        pick in any::<prop::sample::Index>(),
        mutation in arb_mutation(),
    ) {
        let count = drafts.len();
        let mut entries = filled(drafts).entries().unwrap();
        let target = pick.index(count);

        let entry = &mut entries[target];
        match mutation {
            Mutation::Actor => entry.actor_id = "mallory".into(),
            Mutation::Payload => {
                entry.payload = EntryPayload::artifact(Some("edited after commit!".into()))
            }
            Mutation::ArtifactType => {
                entry.artifact_type = if entry.artifact_type == ArtifactType::Signal {
                    ArtifactType::Pdo
                } else {
                    ArtifactType::Signal
                }
            }
        }

        let replica = LedgerStore::open(Box::new(MemoryBackend::with_entries(entries))).unwrap();
        let report = replica.verify_chain().unwrap();

        prop_assert!(!report.valid);
        prop_assert!(report.has_tampering());
        prop_assert_eq!(report.first_break, Some(target as u64));
        let has_hash_mismatch = report.violations.iter().any(|v| matches!(
            v,
            Violation::Cryptographic(CryptographicViolation::HashMismatch { sequence, .. })
                if *sequence == target as u64
        ));
        prop_assert!(has_hash_mismatch);

        let last = target + 1 == count;
        prop_assert_eq!(report.violations.len(), if last { 1 } else { 2 });
        if !last {
            let has_chain_broken = report.violations.iter().any(|v| matches!(
                v,
                Violation::Cryptographic(CryptographicViolation::ChainBroken { sequence, .. })
                    if *sequence == target as u64 + 1
            ));
            prop_assert!(has_chain_broken);
        }
    }
}
