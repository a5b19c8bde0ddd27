//! The fixed decision tables. Pairs not listed here are blocked.

use crate::signal::{AuthorityLevel, Destination, Layer, Signal};

/// Bumped whenever a row changes; recorded alongside decisions that cite it.
pub const RULE_TABLE_VERSION: &str = "2026.2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Allow,
    AllowWithReview,
    Deny,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crossing {
    /// Allowed for signals at or above this authority level.
    Requires(AuthorityLevel),
    Deny,
}

use crate::signal::Destination as D;
use crate::signal::Signal as S;

pub const TRANSITION_RULES: &[(Signal, Destination, Rule)] = &[
    (S::Informational, D::Logging, Rule::Allow),
    (S::Informational, D::Monitoring, Rule::Allow),
    // Advisory: observe, queue, or ask a human. Never grant.
    (S::Advisory, D::Logging, Rule::Allow),
    (S::Advisory, D::Monitoring, Rule::Allow),
    (S::Advisory, D::ReviewQueue, Rule::Allow),
    (S::Advisory, D::Escalation, Rule::AllowWithReview),
    (S::Advisory, D::AuthorityGrant, Rule::Deny),
    (S::Advisory, D::Settlement, Rule::Deny),
    (S::Advisory, D::Release, Rule::Deny),
    (S::Advisory, D::Closure, Rule::Deny),
    (S::Failure, D::Logging, Rule::Allow),
    (S::Failure, D::Monitoring, Rule::Allow),
    (S::Failure, D::ReviewQueue, Rule::Allow),
    (S::Failure, D::Escalation, Rule::AllowWithReview),
    (S::Failure, D::AuthorityGrant, Rule::Deny),
    (S::Failure, D::Settlement, Rule::Deny),
    (S::Failure, D::Release, Rule::Deny),
    (S::Failure, D::Closure, Rule::Deny),
    // An advisory upgraded by a human carries the review requirement with it.
    (S::HumanApproved, D::Logging, Rule::Allow),
    (S::HumanApproved, D::Monitoring, Rule::Allow),
    (S::HumanApproved, D::ReviewQueue, Rule::Allow),
    (S::HumanApproved, D::Escalation, Rule::Allow),
    (S::HumanApproved, D::AuthorityGrant, Rule::AllowWithReview),
    (S::HumanApproved, D::Settlement, Rule::AllowWithReview),
    (S::HumanApproved, D::Release, Rule::AllowWithReview),
    (S::HumanApproved, D::Closure, Rule::AllowWithReview),
    (S::Authoritative, D::Logging, Rule::Allow),
    (S::Authoritative, D::Monitoring, Rule::Allow),
    (S::Authoritative, D::ReviewQueue, Rule::Allow),
    (S::Authoritative, D::Escalation, Rule::Allow),
    (S::Authoritative, D::AuthorityGrant, Rule::Allow),
    (S::Authoritative, D::Settlement, Rule::Allow),
    (S::Authoritative, D::Release, Rule::Allow),
    (S::Authoritative, D::Closure, Rule::Allow),
];

use crate::signal::AuthorityLevel as A;
use crate::signal::Layer as L;

pub const BOUNDARY_RULES: &[(Layer, Layer, Crossing)] = &[
    (L::Telemetry, L::Advisory, Crossing::Requires(A::Observational)),
    (L::Telemetry, L::Governance, Crossing::Requires(A::Observational)),
    (L::Advisory, L::Governance, Crossing::Requires(A::Advisory)),
    (L::Governance, L::Execution, Crossing::Requires(A::HumanApproved)),
    (L::Governance, L::Settlement, Crossing::Requires(A::HumanApproved)),
    (L::Execution, L::Settlement, Crossing::Requires(A::Authoritative)),
    (L::Telemetry, L::Execution, Crossing::Deny),
    (L::Telemetry, L::Settlement, Crossing::Deny),
    (L::Advisory, L::Execution, Crossing::Deny),
    (L::Advisory, L::Settlement, Crossing::Deny),
    // Reporting back down is always allowed.
    (L::Governance, L::Telemetry, Crossing::Requires(A::Observational)),
    (L::Execution, L::Telemetry, Crossing::Requires(A::Observational)),
    (L::Settlement, L::Telemetry, Crossing::Requires(A::Observational)),
];

pub fn transition_rule(signal: Signal, destination: Destination) -> Option<Rule> {
    TRANSITION_RULES
        .iter()
        .find(|(s, d, _)| *s == signal && *d == destination)
        .map(|(_, _, rule)| *rule)
}

pub fn boundary_rule(source: Layer, target: Layer) -> Option<Crossing> {
    BOUNDARY_RULES
        .iter()
        .find(|(s, t, _)| *s == source && *t == target)
        .map(|(_, _, crossing)| *crossing)
}
