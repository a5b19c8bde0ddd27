use chrono::{DateTime, Duration, Utc};
use finality_types::{ActorId, ArtifactId, SequencingViolation, Violation};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MINIMUM_REVIEW_LATENCY_MS: i64 = 5_000;

/// A human approval: who reviewed and where the review lives.
///
/// Carries no times. When the work was submitted and when it was approved
/// are both read from the ledger ([`ReviewTiming`]), so a caller cannot
/// backdate a review past the latency gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewApproval {
    pub reviewer: ActorId,
    pub review_ref: ArtifactId,
}

impl ReviewApproval {
    pub fn new(reviewer: impl Into<ActorId>, review_ref: impl Into<ArtifactId>) -> Self {
        Self {
            reviewer: reviewer.into(),
            review_ref: review_ref.into(),
        }
    }
}

/// Submission and approval instants, both taken from the ledger clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTiming {
    /// Timestamp of the subject's last committed ledger entry.
    pub submitted_at: DateTime<Utc>,
    /// Ledger clock when the approval reached it.
    pub approved_at: DateTime<Utc>,
}

impl ReviewTiming {
    pub fn new(submitted_at: DateTime<Utc>, approved_at: DateTime<Utc>) -> Self {
        Self {
            submitted_at,
            approved_at,
        }
    }

    pub fn latency(&self) -> Duration {
        self.approved_at - self.submitted_at
    }
}

/// Minimum time between submission and approval.
///
/// A comparison of two ledger timestamps, evaluated when the approval
/// arrives. Nothing ever sleeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPolicy {
    pub minimum_latency_ms: i64,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            minimum_latency_ms: DEFAULT_MINIMUM_REVIEW_LATENCY_MS,
        }
    }
}

impl ReviewPolicy {
    pub fn from_millis(minimum_latency_ms: i64) -> Self {
        Self { minimum_latency_ms }
    }

    /// An approval stamped before its submission never passes, whatever
    /// the configured minimum.
    pub fn evaluate(&self, timing: &ReviewTiming) -> Result<(), Violation> {
        let actual_ms = timing.latency().num_milliseconds();
        if actual_ms < 0 || actual_ms < self.minimum_latency_ms {
            return Err(SequencingViolation::ReviewLatencyNotMet {
                required_ms: self.minimum_latency_ms,
                actual_ms,
            }
            .into());
        }
        Ok(())
    }
}
