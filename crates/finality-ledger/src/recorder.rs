use crate::entry::{ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerEntry};
use crate::error::SystemFault;
use crate::store::LedgerStore;
use finality_types::{ActorId, ArtifactId, SequencingViolation, Violation};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Makes every refusal durable before it is reported.
///
/// A rejection counts as recorded only once the ledger append succeeded.
/// When it does not, the caller gets a [`SystemFault`] instead of the
/// rejection.
#[derive(Clone)]
pub struct RejectionRecorder {
    ledger: Arc<LedgerStore>,
    actor: ActorId,
}

impl RejectionRecorder {
    /// `actor` is the component identity stamped on rejection entries.
    pub fn new(ledger: Arc<LedgerStore>, actor: impl Into<ActorId>) -> Self {
        Self {
            ledger,
            actor: actor.into(),
        }
    }

    pub fn record_rejection(
        &self,
        subject_id: &ArtifactId,
        subject_type: ArtifactType,
        reason: &Violation,
        evidence: BTreeMap<String, String>,
    ) -> Result<LedgerEntry, SystemFault> {
        self.record(subject_id, subject_type, None, reason, evidence)
    }

    /// Same as [`record_rejection`](Self::record_rejection), linked to a
    /// parent artifact such as the originating task.
    pub fn record_rejection_under(
        &self,
        subject_id: &ArtifactId,
        subject_type: ArtifactType,
        parent: &ArtifactId,
        reason: &Violation,
        evidence: BTreeMap<String, String>,
    ) -> Result<LedgerEntry, SystemFault> {
        self.record(subject_id, subject_type, Some(parent), reason, evidence)
    }

    fn record(
        &self,
        subject_id: &ArtifactId,
        subject_type: ArtifactType,
        parent: Option<&ArtifactId>,
        reason: &Violation,
        mut evidence: BTreeMap<String, String>,
    ) -> Result<LedgerEntry, SystemFault> {
        evidence.insert("code".into(), reason.code().into());
        evidence.insert("family".into(), reason.family().as_str().into());
        evidence.insert("severity".into(), format!("{:?}", reason.severity()).to_lowercase());

        let mut draft = EntryDraft::new(
            entry_type_for(reason),
            self.actor.clone(),
            subject_id.clone(),
            subject_type,
            EntryPayload::Rejection {
                violation: reason.clone(),
                subject_type,
                evidence,
            },
        );
        if let Some(parent) = parent {
            draft = draft.with_parent(parent.clone());
        }

        match self.ledger.append(draft) {
            Ok(entry) => {
                warn!(
                    subject = %subject_id,
                    code = reason.code(),
                    sequence = entry.sequence,
                    %reason,
                    "rejection recorded"
                );
                Ok(entry)
            }
            Err(source) => {
                error!(
                    subject = %subject_id,
                    code = reason.code(),
                    %source,
                    "rejection could not be recorded; escalating to system fault"
                );
                Err(SystemFault {
                    subject_id: subject_id.clone(),
                    violation: reason.clone(),
                    source,
                })
            }
        }
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }
}

/// Boundary blocks and review gates get their own entry types.
pub fn entry_type_for(violation: &Violation) -> EntryType {
    match violation {
        Violation::Boundary(_) => EntryType::BlockEnforced,
        Violation::Sequencing(SequencingViolation::ReviewLatencyNotMet { .. }) => {
            EntryType::GateFailed
        }
        _ => EntryType::RejectionRecorded,
    }
}
