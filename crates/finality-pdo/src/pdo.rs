use crate::proof::ProofChain;
use crate::review::ReviewApproval;
use chrono::{DateTime, Utc};
use finality_rules::{Destination, Signal};
use finality_types::{
    hash_canonical, ActorId, ArtifactId, CanonicalError, ContentHash, HashDomain, PdoId,
    StructuralViolation, Violation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PdoState {
    Pending,
    ProofVerified,
    DecisionRecorded,
    OutcomeFinalized,
    Finalized,
    Rejected,
}

impl PdoState {
    const FORWARD: [PdoState; 5] = [
        Self::Pending,
        Self::ProofVerified,
        Self::DecisionRecorded,
        Self::OutcomeFinalized,
        Self::Finalized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::ProofVerified => "PROOF_VERIFIED",
            Self::DecisionRecorded => "DECISION_RECORDED",
            Self::OutcomeFinalized => "OUTCOME_FINALIZED",
            Self::Finalized => "FINALIZED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Rejected)
    }

    /// Forward successor, if any.
    pub fn next(self) -> Option<PdoState> {
        let pos = Self::FORWARD.iter().position(|s| *s == self)?;
        Self::FORWARD.get(pos + 1).copied()
    }

    pub fn can_transition(self, to: PdoState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Rejected || self.next() == Some(to)
    }

    /// Every state a record in `self` must have passed through, `self`
    /// included. A rejected record only proves it was created.
    pub fn required_path(self) -> Vec<PdoState> {
        match self {
            Self::Rejected => vec![Self::Pending, Self::Rejected],
            s => Self::FORWARD
                .iter()
                .copied()
                .take_while(|f| *f != s)
                .chain(std::iter::once(s))
                .collect(),
        }
    }
}

impl fmt::Display for PdoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the authority is deciding to do. Each kind is gated against its
/// own destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    Execute,
    Settle,
    Release,
    Close,
}

impl DecisionKind {
    pub fn destination(self) -> Destination {
        match self {
            Self::Execute => Destination::AuthorityGrant,
            Self::Settle => Destination::Settlement,
            Self::Release => Destination::Release,
            Self::Close => Destination::Closure,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Claimed deciding identity; must equal the configured authority.
    pub authority: ActorId,
    pub kind: DecisionKind,
    /// Signal the decision rests on.
    pub basis: Signal,
    pub rationale: String,
    pub decided_at: DateTime<Utc>,
    pub review: Option<ReviewApproval>,
}

impl Decision {
    pub fn new(
        authority: impl Into<ActorId>,
        kind: DecisionKind,
        basis: Signal,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            kind,
            basis,
            rationale: rationale.into(),
            decided_at: Utc::now(),
            review: None,
        }
    }

    pub fn with_review(mut self, review: ReviewApproval) -> Self {
        self.review = Some(review);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub summary: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Outcome {
    pub fn new(status: OutcomeStatus, summary: Option<String>) -> Self {
        Self {
            status,
            summary,
            recorded_at: Utc::now(),
        }
    }
}

/// What a collaborator submits to open a PDO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSeed {
    /// The originating request.
    pub subject: ArtifactId,
    pub submitted_by: ActorId,
    pub proof: ProofChain,
}

impl ProofSeed {
    pub fn new(
        subject: impl Into<ArtifactId>,
        submitted_by: impl Into<ActorId>,
        proof: ProofChain,
    ) -> Self {
        Self {
            subject: subject.into(),
            submitted_by: submitted_by.into(),
            proof,
        }
    }

    pub(crate) fn structural_violation(&self, pdo_id: &PdoId) -> Option<Violation> {
        let missing = if self.subject.is_blank() {
            Some("subject")
        } else if self.submitted_by.is_blank() {
            Some("submitted_by")
        } else {
            self.proof.missing_artifact()
        };
        missing.map(|field| {
            StructuralViolation::MissingField {
                subject: pdo_id.to_string(),
                field: field.to_string(),
            }
            .into()
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdoTransition {
    pub from: PdoState,
    pub to: PdoState,
    pub at: DateTime<Utc>,
    pub actor: ActorId,
    pub ledger_sequence: u64,
}

/// Proof–Decision–Outcome record. Only [`crate::PdoEngine`] changes its
/// state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pdo {
    pub id: PdoId,
    pub subject: ArtifactId,
    pub submitted_by: ActorId,
    pub proof: ProofChain,
    pub decision: Option<Decision>,
    pub outcome: Option<Outcome>,
    pub state: PdoState,
    /// Bumped on every committed transition; the check-and-set token.
    pub version: u64,
    pub history: Vec<PdoTransition>,
    pub created_at: DateTime<Utc>,
    pub rejection: Option<Violation>,
}

#[derive(Serialize)]
struct PdoContent<'a> {
    id: &'a PdoId,
    subject: &'a ArtifactId,
    proof: &'a ProofChain,
    decision: &'a Option<Decision>,
    outcome: &'a Option<Outcome>,
}

impl Pdo {
    /// Digest over what the PDO attests to, used as its O-PDO child hash.
    pub fn content_hash(&self) -> Result<ContentHash, CanonicalError> {
        hash_canonical(
            HashDomain::PdoContent,
            &PdoContent {
                id: &self.id,
                subject: &self.subject,
                proof: &self.proof,
                decision: &self.decision,
                outcome: &self.outcome,
            },
        )
    }

    /// Why this PDO cannot stand as an O-PDO child, as the status to
    /// report. Only a `FINALIZED` PDO whose outcome succeeded qualifies.
    pub fn child_refusal(&self) -> Option<String> {
        if self.state != PdoState::Finalized {
            return Some(self.state.to_string());
        }
        match self.outcome.as_ref().map(|o| o.status) {
            Some(OutcomeStatus::Succeeded) => None,
            Some(OutcomeStatus::Failed) => Some(format!("{}(FAILED)", self.state)),
            None => Some(format!("{}(NO_OUTCOME)", self.state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_and_rejection() {
        assert_eq!(PdoState::Pending.next(), Some(PdoState::ProofVerified));
        assert_eq!(PdoState::Finalized.next(), None);
        assert!(PdoState::Pending.can_transition(PdoState::ProofVerified));
        assert!(PdoState::DecisionRecorded.can_transition(PdoState::Rejected));
        assert!(!PdoState::Pending.can_transition(PdoState::DecisionRecorded));
        assert!(!PdoState::Finalized.can_transition(PdoState::Rejected));
        assert!(!PdoState::Rejected.can_transition(PdoState::Pending));
    }

    #[test]
    fn required_paths() {
        assert_eq!(PdoState::Pending.required_path(), vec![PdoState::Pending]);
        assert_eq!(
            PdoState::DecisionRecorded.required_path(),
            vec![
                PdoState::Pending,
                PdoState::ProofVerified,
                PdoState::DecisionRecorded
            ]
        );
        assert_eq!(PdoState::Finalized.required_path().len(), 5);
        assert_eq!(
            PdoState::Rejected.required_path(),
            vec![PdoState::Pending, PdoState::Rejected]
        );
    }

    #[test]
    fn decision_kinds_map_to_destinations() {
        assert_eq!(DecisionKind::Execute.destination(), Destination::AuthorityGrant);
        assert_eq!(DecisionKind::Settle.destination(), Destination::Settlement);
        assert!(DecisionKind::Close.destination().grants_authority());
    }

    #[test]
    fn state_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&PdoState::OutcomeFinalized).unwrap(),
            "\"OUTCOME_FINALIZED\""
        );
        assert_eq!(PdoState::ProofVerified.to_string(), "PROOF_VERIFIED");
    }
}
