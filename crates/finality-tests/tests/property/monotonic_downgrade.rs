//! Property tests: combining signals never raises authority, and an
//! advisory anywhere in the mix keeps the combination out of settlement.

use finality_rules::{combine, AuthorityLevel, Destination, RuleEngine, Signal};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![
        Just(Signal::Informational),
        Just(Signal::Advisory),
        Just(Signal::Failure),
        Just(Signal::HumanApproved),
        Just(Signal::Authoritative),
    ]
}

fn arb_authority_destination() -> impl Strategy<Value = Destination> {
    prop_oneof![
        Just(Destination::AuthorityGrant),
        Just(Destination::Settlement),
        Just(Destination::Release),
        Just(Destination::Closure),
    ]
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// The combined authority is at or below every input.
    #[test]
    fn combination_never_upgrades(signals in proptest::collection::vec(arb_signal(), 1..16)) {
        let combined = combine(&signals).expect("non-empty input");
        for signal in &signals {
            prop_assert!(combined.authority() <= signal.authority());
        }
        prop_assert!(signals.contains(&combined));
    }

    /// Mixing in an advisory blocks every authority-granting destination.
    #[test]
    fn advisory_in_the_mix_blocks_authority(
        mut signals in proptest::collection::vec(arb_signal(), 0..16),
        position in any::<prop::sample::Index>(),
        destination in arb_authority_destination(),
    ) {
        let at = position.index(signals.len() + 1);
        signals.insert(at, Signal::Advisory);

        let combined = combine(&signals).expect("non-empty input");
        prop_assert!(combined.authority() <= AuthorityLevel::Advisory);

        let verdict = RuleEngine::new().check_combined(&signals, destination);
        prop_assert!(!verdict.is_allowed());
        let code = verdict.code();
        prop_assert!(matches!(code, Some("GS_300") | Some("GS_301")), "{:?}", code);
    }

    /// Adding a signal can only keep or lower the combined authority.
    #[test]
    fn adding_a_signal_never_raises(
        signals in proptest::collection::vec(arb_signal(), 1..16),
        extra in arb_signal(),
    ) {
        let before = combine(&signals).expect("non-empty input").authority();
        let mut more = signals.clone();
        more.push(extra);
        let after = combine(&more).expect("non-empty input").authority();
        prop_assert!(after <= before);
    }
}
