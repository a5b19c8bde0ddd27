use crate::signal::{AuthorityLevel, Destination, Layer, Signal};
use crate::table::{boundary_rule, transition_rule, Crossing, Rule, RULE_TABLE_VERSION};
use finality_types::{BoundaryViolation, Violation};
use serde::{Deserialize, Serialize};

/// Outcome of a rule check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allow { requires_human_review: bool },
    Block { violation: BoundaryViolation },
}

impl Verdict {
    fn allow() -> Self {
        Self::Allow {
            requires_human_review: false,
        }
    }

    fn allow_with_review() -> Self {
        Self::Allow {
            requires_human_review: true,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub fn requires_human_review(&self) -> bool {
        matches!(
            self,
            Self::Allow {
                requires_human_review: true
            }
        )
    }

    /// Stable code of a block, `None` when allowed.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Allow { .. } => None,
            Self::Block { violation } => Some(violation.code()),
        }
    }

    /// `Ok(requires_human_review)` or the blocking violation.
    pub fn into_result(self) -> Result<bool, Violation> {
        match self {
            Self::Allow {
                requires_human_review,
            } => Ok(requires_human_review),
            Self::Block { violation } => Err(violation.into()),
        }
    }
}

fn block(violation: BoundaryViolation) -> Verdict {
    Verdict::Block { violation }
}

fn unknown_route(signal: impl Into<String>, destination: impl Into<String>) -> Verdict {
    block(BoundaryViolation::UnknownRoute {
        signal: signal.into(),
        destination: destination.into(),
    })
}

/// Look up `(signal, destination)`. Missing rows are blocked.
pub fn check_transition(signal: Signal, destination: Destination) -> Verdict {
    match transition_rule(signal, destination) {
        Some(Rule::Allow) => Verdict::allow(),
        Some(Rule::AllowWithReview) => Verdict::allow_with_review(),
        Some(Rule::Deny) => block(BoundaryViolation::AdvisoryToAuthority {
            signal: signal.to_string(),
            destination: destination.to_string(),
        }),
        None => unknown_route(signal.as_str(), destination.as_str()),
    }
}

/// Look up a layer crossing for `signal`. Missing rows are blocked.
pub fn check_boundary(source: Layer, target: Layer, signal: Signal) -> Verdict {
    let crossing_violation = || BoundaryViolation::LayerCrossing {
        source_layer: source.to_string(),
        target_layer: target.to_string(),
        signal: signal.to_string(),
    };

    match boundary_rule(source, target) {
        None => unknown_route(signal.as_str(), format!("{source}->{target}")),
        Some(Crossing::Deny) => block(crossing_violation()),
        Some(Crossing::Requires(required)) => {
            let level = signal.authority();
            if target.is_authority_layer() && level < AuthorityLevel::HumanApproved {
                block(BoundaryViolation::AdvisoryToAuthority {
                    signal: signal.to_string(),
                    destination: target.to_string(),
                })
            } else if level < required {
                block(crossing_violation())
            } else if target.is_authority_layer() && level == AuthorityLevel::HumanApproved {
                Verdict::allow_with_review()
            } else {
                Verdict::allow()
            }
        }
    }
}

/// The weakest input decides. An empty combination has no authority.
pub fn combine(signals: &[Signal]) -> Option<Signal> {
    signals.iter().copied().min_by_key(|s| s.authority())
}

/// Gate a combination of signals as one.
pub fn check_combined(signals: &[Signal], destination: Destination) -> Verdict {
    match combine(signals) {
        Some(signal) => check_transition(signal, destination),
        None => unknown_route("<none>", destination.as_str()),
    }
}

/// Stateless handle over the versioned tables.
///
/// Holds no state; every call is independently reproducible. Components keep
/// one so the table version they enforce is visible and injectable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn version(&self) -> &'static str {
        RULE_TABLE_VERSION
    }

    pub fn check_transition(&self, signal: Signal, destination: Destination) -> Verdict {
        check_transition(signal, destination)
    }

    pub fn check_boundary(&self, source: Layer, target: Layer, signal: Signal) -> Verdict {
        check_boundary(source, target, signal)
    }

    pub fn check_combined(&self, signals: &[Signal], destination: Destination) -> Verdict {
        check_combined(signals, destination)
    }

    /// String entry point for external collaborators. Unparseable names are
    /// blocked, never guessed.
    pub fn check_transition_named(&self, signal: &str, destination: &str) -> Verdict {
        match (signal.parse::<Signal>(), destination.parse::<Destination>()) {
            (Ok(s), Ok(d)) => check_transition(s, d),
            _ => unknown_route(signal, destination),
        }
    }

    pub fn check_boundary_named(&self, source: &str, target: &str, signal: &str) -> Verdict {
        match (
            source.parse::<Layer>(),
            target.parse::<Layer>(),
            signal.parse::<Signal>(),
        ) {
            (Ok(src), Ok(tgt), Ok(sig)) => check_boundary(src, tgt, sig),
            _ => unknown_route(signal, format!("{source}->{target}")),
        }
    }
}
