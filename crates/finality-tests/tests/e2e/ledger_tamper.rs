//! A committed entry mutated in storage is located exactly.

use finality_ledger::{
    ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerError, LedgerStore, MemoryBackend,
};
use finality_types::{CryptographicViolation, Violation};
use std::path::Path;

const ENTRIES: u64 = 45;
const TAMPERED: u64 = 42;

fn fill(store: &LedgerStore) {
    for i in 0..ENTRIES {
        store
            .append(EntryDraft::new(
                EntryType::ArtifactIssued,
                format!("agent-{}", i % 3),
                format!("REQ-{i}"),
                ArtifactType::Request,
                EntryPayload::artifact(Some(format!("request {i}"))),
            ))
            .unwrap();
    }
}

fn assert_located(violations: &[Violation]) {
    assert_eq!(violations.len(), 2, "{violations:?}");
    assert!(violations.iter().any(|v| matches!(
        v,
        Violation::Cryptographic(CryptographicViolation::HashMismatch { sequence: TAMPERED, .. })
    )));
    assert!(violations.iter().any(|v| matches!(
        v,
        Violation::Cryptographic(CryptographicViolation::ChainBroken { sequence, .. })
            if *sequence == TAMPERED + 1
    )));
}

fn rewrite_line(path: &Path, index: usize, edit: impl FnOnce(&mut serde_json::Value)) {
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut value: serde_json::Value = serde_json::from_str(&lines[index]).unwrap();
    edit(&mut value);
    lines[index] = serde_json::to_string(&value).unwrap();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[test]
fn mutated_file_entry_is_located() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    {
        let store = LedgerStore::open_file(&path, false, true).unwrap();
        fill(&store);
        assert!(store.verify_chain().unwrap().valid);
    }

    rewrite_line(&path, TAMPERED as usize, |entry| {
        entry["payload"]["notes"] = serde_json::Value::String("edited after commit".into());
    });

    let store = LedgerStore::open_file(&path, true, false).unwrap();
    let report = store.verify_chain().unwrap();
    assert!(!report.valid);
    assert!(report.has_tampering());
    assert_eq!(report.entries_checked, ENTRIES as usize);
    assert_eq!(report.first_break, Some(TAMPERED));
    assert_located(&report.violations);

    let refused = LedgerStore::open_file(&path, true, true).err();
    assert_eq!(
        refused,
        Some(LedgerError::IntegrityFailure {
            violations: 2,
            first_break: Some(TAMPERED),
        })
    );
}

#[test]
fn mutated_memory_entry_is_located() {
    let original = LedgerStore::in_memory();
    fill(&original);
    let mut entries = original.entries().unwrap();
    entries[TAMPERED as usize].actor_id = "mallory".into();

    let replica = LedgerStore::open(Box::new(MemoryBackend::with_entries(entries))).unwrap();
    let report = replica.verify_chain().unwrap();
    assert_eq!(report.first_break, Some(TAMPERED));
    assert_located(&report.violations);
}

#[test]
fn verification_is_repeatable() {
    let store = LedgerStore::in_memory();
    fill(&store);
    let first = store.verify_chain().unwrap();
    let second = store.verify_chain().unwrap();
    assert!(first.valid);
    assert_eq!(first, second);
    assert_eq!(first.head_hash, store.head_hash().unwrap());
}
