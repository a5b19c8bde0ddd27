//! PDO lifecycle engine.
//!
//! Every transition is check-and-set: under the registry write lock the
//! caller's snapshot version is compared with the stored one, the transition
//! entry is appended to the ledger, and only then is the new state stored.
//! A concurrent caller holding the same snapshot gets `StaleState`.

use crate::error::{FinalityError, FinalityResult};
use crate::opdo::{ChildPdo, ChildStatus};
use crate::pdo::{Decision, Outcome, Pdo, PdoState, PdoTransition, ProofSeed};
use crate::review::{ReviewPolicy, ReviewTiming};
use finality_ledger::{
    ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerError, LedgerStore, RejectionRecorder,
};
use finality_rules::RuleEngine;
use finality_types::{
    ActorId, ArtifactId, AuthorityIdentity, BoundaryViolation, CryptographicViolation, PdoId,
    StateMachineViolation, StructuralViolation, Violation,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::info;

pub const DEFAULT_ENGINE_ACTOR: &str = "finality-pdo-engine";

#[derive(Clone, Debug)]
pub struct PdoEngineConfig {
    /// The only identity whose decisions are accepted.
    pub authority: AuthorityIdentity,
    /// Identity stamped on engine-driven ledger entries.
    pub actor: ActorId,
    pub review_policy: ReviewPolicy,
}

impl PdoEngineConfig {
    pub fn new(authority: AuthorityIdentity) -> Self {
        Self {
            authority,
            actor: ActorId::new(DEFAULT_ENGINE_ACTOR),
            review_policy: ReviewPolicy::default(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_review_policy(mut self, policy: ReviewPolicy) -> Self {
        self.review_policy = policy;
        self
    }
}

type Records = BTreeMap<PdoId, Pdo>;

pub struct PdoEngine {
    ledger: Arc<LedgerStore>,
    recorder: RejectionRecorder,
    rules: RuleEngine,
    config: PdoEngineConfig,
    records: RwLock<Records>,
}

fn evidence(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

impl PdoEngine {
    pub fn new(ledger: Arc<LedgerStore>, config: PdoEngineConfig) -> Self {
        let recorder = RejectionRecorder::new(Arc::clone(&ledger), config.actor.clone());
        Self {
            ledger,
            recorder,
            rules: RuleEngine::new(),
            config,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn authority(&self) -> &AuthorityIdentity {
        &self.config.authority
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    /// Open a PDO in `PENDING`.
    pub fn create(&self, seed: ProofSeed) -> FinalityResult<Pdo> {
        let id = PdoId::generate();
        if let Some(violation) = seed.structural_violation(&id) {
            return self.reject(&id, violation, evidence(&[("subject", seed.subject.to_string())]));
        }

        let mut records = self.write_records()?;
        let entry = self.ledger.append(
            EntryDraft::new(
                EntryType::PdoCreated,
                seed.submitted_by.clone(),
                &id,
                ArtifactType::Pdo,
                EntryPayload::PdoTransition {
                    from: None,
                    to: PdoState::Pending.as_str().into(),
                    version: 0,
                    detail: Some(seed.proof.anchor().to_hex()),
                },
            )
            .with_parent(seed.subject.clone()),
        )?;

        let pdo = Pdo {
            id: id.clone(),
            subject: seed.subject,
            submitted_by: seed.submitted_by,
            proof: seed.proof,
            decision: None,
            outcome: None,
            state: PdoState::Pending,
            version: 0,
            history: Vec::new(),
            created_at: entry.timestamp,
            rejection: None,
        };
        records.insert(id.clone(), pdo.clone());
        info!(pdo = %id, sequence = entry.sequence, "pdo created");
        Ok(pdo)
    }

    /// Check the proof chain and advance to `PROOF_VERIFIED`. An
    /// inconsistent chain rejects the PDO for good.
    pub fn verify_proof(&self, pdo: &Pdo) -> FinalityResult<Pdo> {
        let mut records = self.write_records()?;
        let current =
            self.checkout(&records, pdo, &[PdoState::Pending], PdoState::ProofVerified)?;

        if let Err(link) = current.proof.verify() {
            let violation: Violation = CryptographicViolation::ProofChainInconsistent {
                subject_id: pdo.id.to_string(),
                link: link.to_string(),
            }
            .into();
            let entry = self.recorder.record_rejection(
                &ArtifactId::from(&pdo.id),
                ArtifactType::Pdo,
                &violation,
                evidence(&[("link", link.to_string())]),
            )?;
            let actor = self.config.actor.clone();
            let stored = violation.clone();
            self.commit(
                &mut records,
                current,
                PdoState::Rejected,
                &actor,
                Some(violation.code().into()),
                |p| p.rejection = Some(stored),
            )?;
            return Err(FinalityError::Rejected {
                violation,
                sequence: entry.sequence,
            });
        }

        let actor = self.config.actor.clone();
        self.commit(&mut records, current, PdoState::ProofVerified, &actor, None, |_| {})
    }

    /// Accept a decision from the designated authority only.
    ///
    /// The basis signal is gated against the decision kind's destination.
    /// When the rule requires human review, an approval must be attached and
    /// must pass the latency gate. Latency runs from the PDO's last ledger
    /// entry to the ledger clock now; an `ADVISORY_UPGRADE_APPROVED` entry
    /// carrying both times precedes the transition. Any refusal leaves the
    /// PDO where it was.
    pub fn record_decision(
        &self,
        pdo: &Pdo,
        caller: &ActorId,
        decision: Decision,
    ) -> FinalityResult<Pdo> {
        let mut records = self.write_records()?;
        let current =
            self.checkout(&records, pdo, &[PdoState::ProofVerified], PdoState::DecisionRecorded)?;

        let authority = &self.config.authority;
        for claimed in [caller, &decision.authority] {
            if !authority.is(claimed) {
                return self.reject(
                    &pdo.id,
                    BoundaryViolation::UnauthorizedAuthority {
                        claimed: claimed.to_string(),
                        expected: authority.to_string(),
                    }
                    .into(),
                    evidence(&[("caller", caller.to_string())]),
                );
            }
        }

        let destination = decision.kind.destination();
        let requires_review = match self
            .rules
            .check_transition(decision.basis, destination)
            .into_result()
        {
            Ok(requires_review) => requires_review,
            Err(violation) => {
                return self.reject(
                    &pdo.id,
                    violation,
                    evidence(&[
                        ("signal", decision.basis.to_string()),
                        ("destination", destination.to_string()),
                        ("rule_table", self.rules.version().to_string()),
                    ]),
                )
            }
        };

        if requires_review {
            let Some(review) = decision.review.as_ref() else {
                return self.reject(
                    &pdo.id,
                    StateMachineViolation::HumanReviewRequired {
                        subject_id: pdo.id.to_string(),
                    }
                    .into(),
                    evidence(&[("signal", decision.basis.to_string())]),
                );
            };
            let submitted_at = current.history.last().map_or(current.created_at, |t| t.at);
            let timing = ReviewTiming::new(submitted_at, self.ledger.now());
            if let Err(violation) = self.config.review_policy.evaluate(&timing) {
                return self.reject(
                    &pdo.id,
                    violation,
                    evidence(&[
                        ("review_ref", review.review_ref.to_string()),
                        ("submitted_at", timing.submitted_at.to_rfc3339()),
                        ("approved_at", timing.approved_at.to_rfc3339()),
                    ]),
                );
            }
            self.ledger.append(
                EntryDraft::new(
                    EntryType::AdvisoryUpgradeApproved,
                    review.reviewer.clone(),
                    &pdo.id,
                    ArtifactType::Pdo,
                    EntryPayload::Review {
                        reviewer: review.reviewer.clone(),
                        review_ref: review.review_ref.clone(),
                        submitted_at: timing.submitted_at,
                        approved_at: timing.approved_at,
                        latency_ms: timing.latency().num_milliseconds(),
                    },
                )
                .with_parent(review.review_ref.clone()),
            )?;
        }

        let detail = format!("{:?} on {}", decision.kind, decision.basis);
        self.commit(
            &mut records,
            current,
            PdoState::DecisionRecorded,
            caller,
            Some(detail),
            |p| p.decision = Some(decision),
        )
    }

    /// Advance to `OUTCOME_FINALIZED` then `FINALIZED`, one ledger entry
    /// each. Resumes from `OUTCOME_FINALIZED` if the second append failed
    /// earlier.
    pub fn finalize_outcome(&self, pdo: &Pdo, outcome: Outcome) -> FinalityResult<Pdo> {
        let mut records = self.write_records()?;
        let current = self.checkout(
            &records,
            pdo,
            &[PdoState::DecisionRecorded, PdoState::OutcomeFinalized],
            PdoState::OutcomeFinalized,
        )?;

        if let Err(link) = current.proof.verify() {
            return self.reject(
                &pdo.id,
                CryptographicViolation::ProofChainInconsistent {
                    subject_id: pdo.id.to_string(),
                    link: link.to_string(),
                }
                .into(),
                BTreeMap::new(),
            );
        }

        let Some(decision) = current.decision.clone() else {
            return self.reject(
                &pdo.id,
                StateMachineViolation::PrematureFinality {
                    subject_id: pdo.id.to_string(),
                    reason: "no decision recorded".into(),
                }
                .into(),
                BTreeMap::new(),
            );
        };
        if !self.config.authority.is(&decision.authority) {
            return self.reject(
                &pdo.id,
                BoundaryViolation::UnauthorizedAuthority {
                    claimed: decision.authority.to_string(),
                    expected: self.config.authority.to_string(),
                }
                .into(),
                BTreeMap::new(),
            );
        }
        if let Err(violation) = self
            .rules
            .check_transition(decision.basis, decision.kind.destination())
            .into_result()
        {
            return self.reject(&pdo.id, violation, BTreeMap::new());
        }

        let actor = self.config.actor.clone();
        let current = if current.state == PdoState::DecisionRecorded {
            let detail = format!("{:?}", outcome.status);
            self.commit(
                &mut records,
                current,
                PdoState::OutcomeFinalized,
                &actor,
                Some(detail),
                |p| p.outcome = Some(outcome),
            )?
        } else {
            current
        };
        self.commit(&mut records, current, PdoState::Finalized, &actor, None, |_| {})
    }

    /// Move any non-terminal PDO to `REJECTED`. The rejection entry is
    /// written first, then the transition.
    pub fn reject_pdo(
        &self,
        pdo: &Pdo,
        by: &ActorId,
        reason: impl Into<String>,
    ) -> FinalityResult<Pdo> {
        let mut records = self.write_records()?;
        let current = self.checkout(
            &records,
            pdo,
            &[
                PdoState::Pending,
                PdoState::ProofVerified,
                PdoState::DecisionRecorded,
                PdoState::OutcomeFinalized,
            ],
            PdoState::Rejected,
        )?;

        let violation: Violation = StructuralViolation::ExplicitRejection {
            by: by.to_string(),
            reason: reason.into(),
        }
        .into();
        self.recorder.record_rejection(
            &ArtifactId::from(&pdo.id),
            ArtifactType::Pdo,
            &violation,
            BTreeMap::new(),
        )?;
        let code = violation.code().to_string();
        self.commit(
            &mut records,
            current,
            PdoState::Rejected,
            by,
            Some(code),
            |p| p.rejection = Some(violation),
        )
    }

    /// Turn a `FINALIZED` PDO with a successful outcome into an O-PDO child.
    pub fn child_candidate(
        &self,
        pdo_id: &PdoId,
        contributor: impl Into<ActorId>,
        source_task: impl Into<ArtifactId>,
        validation_record: impl Into<ArtifactId>,
    ) -> FinalityResult<ChildPdo> {
        let pdo = match self.get(pdo_id)? {
            Some(pdo) => pdo,
            None => {
                return self.reject(
                    pdo_id,
                    StructuralViolation::UnknownSubject {
                        subject_id: pdo_id.to_string(),
                    }
                    .into(),
                    BTreeMap::new(),
                )
            }
        };
        if let Some(status) = pdo.child_refusal() {
            return self.reject(
                pdo_id,
                StructuralViolation::ChildNotValidated {
                    child_id: pdo_id.to_string(),
                    status,
                }
                .into(),
                BTreeMap::new(),
            );
        }
        Ok(ChildPdo::new(
            pdo_id.clone(),
            contributor,
            source_task,
            pdo.content_hash()?,
        )
        .with_status(ChildStatus::Validated)
        .with_validation_record(validation_record))
    }

    pub fn get(&self, id: &PdoId) -> FinalityResult<Option<Pdo>> {
        let records = self.records.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    /// Every PDO, ordered by id.
    pub fn snapshot(&self) -> FinalityResult<Vec<Pdo>> {
        let records = self.records.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn write_records(&self) -> FinalityResult<RwLockWriteGuard<'_, Records>> {
        Ok(self.records.write().map_err(|_| LedgerError::LockPoisoned)?)
    }

    fn reject<T>(
        &self,
        pdo_id: &PdoId,
        violation: Violation,
        evidence: BTreeMap<String, String>,
    ) -> FinalityResult<T> {
        let entry = self.recorder.record_rejection(
            &ArtifactId::from(pdo_id),
            ArtifactType::Pdo,
            &violation,
            evidence,
        )?;
        Err(FinalityError::Rejected {
            violation,
            sequence: entry.sequence,
        })
    }

    /// Compare the caller's snapshot with the stored record. Refusals are
    /// recorded before returning.
    fn checkout(
        &self,
        records: &Records,
        snapshot: &Pdo,
        allowed_from: &[PdoState],
        to: PdoState,
    ) -> FinalityResult<Pdo> {
        let subject_id = snapshot.id.to_string();
        let violation: Violation = match records.get(&snapshot.id) {
            None => StructuralViolation::UnknownSubject { subject_id }.into(),
            Some(current) if current.version != snapshot.version => {
                StateMachineViolation::StaleState {
                    subject_id,
                    expected_version: snapshot.version,
                    found_version: current.version,
                }
                .into()
            }
            Some(current) if current.state.is_terminal() => StateMachineViolation::AlreadyFinal {
                subject_id,
                state: current.state.to_string(),
            }
            .into(),
            Some(current) if !allowed_from.contains(&current.state) => {
                StateMachineViolation::IllegalTransition {
                    subject_id,
                    from: current.state.to_string(),
                    to: to.to_string(),
                }
                .into()
            }
            Some(current) => return Ok(current.clone()),
        };
        self.reject(&snapshot.id, violation, BTreeMap::new())
    }

    fn commit(
        &self,
        records: &mut Records,
        mut pdo: Pdo,
        to: PdoState,
        actor: &ActorId,
        detail: Option<String>,
        apply: impl FnOnce(&mut Pdo),
    ) -> FinalityResult<Pdo> {
        let from = pdo.state;
        let entry = self.ledger.append(
            EntryDraft::new(
                EntryType::PdoTransitioned,
                actor.clone(),
                &pdo.id,
                ArtifactType::Pdo,
                EntryPayload::PdoTransition {
                    from: Some(from.as_str().into()),
                    to: to.as_str().into(),
                    version: pdo.version + 1,
                    detail,
                },
            )
            .with_parent(pdo.subject.clone()),
        )?;

        apply(&mut pdo);
        pdo.state = to;
        pdo.version += 1;
        pdo.history.push(PdoTransition {
            from,
            to,
            at: entry.timestamp,
            actor: actor.clone(),
            ledger_sequence: entry.sequence,
        });
        records.insert(pdo.id.clone(), pdo.clone());

        info!(
            pdo = %pdo.id,
            from = %from,
            to = %to,
            version = pdo.version,
            sequence = entry.sequence,
            "pdo transition committed"
        );
        Ok(pdo)
    }
}
