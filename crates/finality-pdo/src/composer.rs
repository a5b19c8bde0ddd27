//! O-PDO composition and the DRAFT → SEALED → FINAL machine.
//!
//! The composer is the only writer of [`CompositeProof`]s and O-PDO state.
//! Transitions follow the same check-and-set discipline as
//! [`crate::PdoEngine`]: snapshot version compared under the registry lock,
//! ledger entry first, stored state second.

use crate::engine::PdoEngine;
use crate::error::{FinalityError, FinalityResult};
use crate::merkle::CompositeProof;
use crate::opdo::{validate_children, ChildPdo, OpdoState, OpdoTransition, OrchestratedPdo};
use finality_ledger::{
    ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerError, LedgerStore, RejectionRecorder,
};
use finality_types::{
    ActorId, ArtifactId, AuthorityIdentity, ContentHash, CryptographicViolation, OpdoId, StateMachineViolation,
    StructuralViolation, Violation,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::{debug, info};

type Records = BTreeMap<OpdoId, OrchestratedPdo>;

pub struct OpdoComposer {
    ledger: Arc<LedgerStore>,
    recorder: RejectionRecorder,
    orchestrator: AuthorityIdentity,
    pdo_engine: Option<Arc<PdoEngine>>,
    records: RwLock<Records>,
}

struct Step<'a> {
    entry_type: EntryType,
    to: OpdoState,
    trigger: &'a str,
    actor: &'a ActorId,
    review_ref: Option<&'a ArtifactId>,
}

impl OpdoComposer {
    pub fn new(ledger: Arc<LedgerStore>, orchestrator: AuthorityIdentity) -> Self {
        let recorder = RejectionRecorder::new(Arc::clone(&ledger), orchestrator.actor_id().clone());
        Self {
            ledger,
            recorder,
            orchestrator,
            pdo_engine: None,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Cross-check every candidate against the engine's records: the PDO
    /// must exist, be `FINALIZED` with a successful outcome, and hash to the
    /// child's content hash.
    pub fn with_pdo_engine(mut self, engine: Arc<PdoEngine>) -> Self {
        self.pdo_engine = Some(engine);
        self
    }

    pub fn orchestrator(&self) -> &AuthorityIdentity {
        &self.orchestrator
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    /// Validate the candidates and open a `DRAFT` O-PDO over them.
    pub fn bind_children(
        &self,
        task_ref: impl Into<ArtifactId>,
        candidates: Vec<ChildPdo>,
    ) -> FinalityResult<OrchestratedPdo> {
        let task_ref = task_ref.into();
        let id = OpdoId::generate();

        let precheck = if self.orchestrator.actor_id().is_blank() {
            Err(StructuralViolation::MissingOrchestrator.into())
        } else if task_ref.is_blank() {
            Err(StructuralViolation::MissingField {
                subject: id.to_string(),
                field: "task_ref".into(),
            }
            .into())
        } else {
            validate_children(&candidates).and_then(|()| self.check_against_engine(&candidates))
        };
        if let Err(violation) = precheck {
            return self.reject_under(&id, Some(&task_ref), violation, candidate_evidence(&candidates));
        }

        let mut records = self.write_records()?;
        let actor = self.orchestrator.actor_id().clone();
        let entry = self.ledger.append(
            EntryDraft::new(
                EntryType::OpdoBound,
                actor.clone(),
                &id,
                ArtifactType::Opdo,
                EntryPayload::OpdoTransition {
                    from: None,
                    to: OpdoState::Draft.as_str().into(),
                    version: 0,
                    merkle_root: None,
                    final_hash: None,
                    human_review_ref: None,
                },
            )
            .with_parent(task_ref.clone()),
        )?;

        let opdo = OrchestratedPdo {
            id: id.clone(),
            task_ref,
            orchestrator: self.orchestrator.clone(),
            child_pdos: candidates,
            composite_proof: None,
            state: OpdoState::Draft,
            state_history: vec![OpdoTransition {
                from: None,
                to: OpdoState::Draft,
                at: entry.timestamp,
                trigger: "bind_children".into(),
                actor,
                ledger_sequence: entry.sequence,
            }],
            version: 0,
            created_at: entry.timestamp,
            sealed_at: None,
            finalized_at: None,
            human_review_ref: None,
            final_hash: None,
        };
        records.insert(id.clone(), opdo.clone());
        info!(
            opdo = %id,
            children = opdo.child_pdos.len(),
            sequence = entry.sequence,
            "children bound"
        );
        Ok(opdo)
    }

    /// Add one child to a `DRAFT` O-PDO. The whole set is revalidated.
    pub fn add_child(&self, opdo: &OrchestratedPdo, child: ChildPdo) -> FinalityResult<OrchestratedPdo> {
        let mut records = self.write_records()?;
        let current = self.checkout(&records, opdo)?;
        if current.state != OpdoState::Draft {
            return self.reject(
                opdo,
                StateMachineViolation::SealedImmutable {
                    subject_id: opdo.id.to_string(),
                }
                .into(),
            );
        }

        let mut children = current.child_pdos.clone();
        children.push(child);
        if let Err(violation) =
            validate_children(&children).and_then(|()| self.check_against_engine(&children))
        {
            return self.reject(opdo, violation);
        }

        let actor = self.orchestrator.actor_id().clone();
        self.commit(
            &mut records,
            current,
            Step {
                entry_type: EntryType::OpdoBound,
                to: OpdoState::Draft,
                trigger: "add_child",
                actor: &actor,
                review_ref: None,
            },
            |o| o.child_pdos = children,
        )
    }

    /// Build the composite proof over the current children. Nothing is
    /// stored; [`seal`](Self::seal) stores it.
    pub fn generate_composite_proof(&self, opdo: &OrchestratedPdo) -> FinalityResult<CompositeProof> {
        let leaves = opdo.leaf_hashes()?;
        match CompositeProof::build(opdo.id.as_str(), &leaves) {
            Ok(proof) => {
                debug!(
                    opdo = %opdo.id,
                    root = %proof.merkle_root,
                    height = proof.tree_height,
                    "composite proof generated"
                );
                Ok(proof)
            }
            Err(violation) => self.reject(opdo, violation),
        }
    }

    pub fn seal(&self, opdo: &OrchestratedPdo) -> FinalityResult<OrchestratedPdo> {
        self.seal_inner(opdo, None)
    }

    /// Seal with a proof produced elsewhere. It must match the children.
    pub fn seal_with_proof(
        &self,
        opdo: &OrchestratedPdo,
        proof: CompositeProof,
    ) -> FinalityResult<OrchestratedPdo> {
        self.seal_inner(opdo, Some(proof))
    }

    fn seal_inner(
        &self,
        opdo: &OrchestratedPdo,
        supplied: Option<CompositeProof>,
    ) -> FinalityResult<OrchestratedPdo> {
        let mut records = self.write_records()?;
        let current = self.checkout(&records, opdo)?;
        if current.state != OpdoState::Draft {
            return self.reject(opdo, self.illegal(&current, OpdoState::Sealed));
        }
        let generated = self.generate_composite_proof(&current)?;
        let proof = match supplied {
            Some(proof) if proof.merkle_root != generated.merkle_root || !proof.is_consistent() => {
                return self.reject(
                    opdo,
                    CryptographicViolation::MerkleRootMismatch {
                        subject_id: opdo.id.to_string(),
                        stored: proof.merkle_root,
                        computed: generated.merkle_root,
                    }
                    .into(),
                );
            }
            Some(proof) => proof,
            None => generated,
        };

        let actor = self.orchestrator.actor_id().clone();
        let mut sealed = current;
        sealed.composite_proof = Some(proof);
        self.commit(
            &mut records,
            sealed,
            Step {
                entry_type: EntryType::FinalitySealed,
                to: OpdoState::Sealed,
                trigger: "seal",
                actor: &actor,
                review_ref: None,
            },
            |_| {},
        )
    }

    /// `SEALED` → `FINAL`. Requires a non-blank human review reference and
    /// a composite proof that still matches the children.
    pub fn finalize(
        &self,
        opdo: &OrchestratedPdo,
        human_review_ref: Option<ArtifactId>,
    ) -> FinalityResult<OrchestratedPdo> {
        let mut records = self.write_records()?;
        let current = self.checkout(&records, opdo)?;
        let subject_id = opdo.id.to_string();
        if current.state != OpdoState::Sealed {
            return self.reject(
                opdo,
                StateMachineViolation::SealRequired {
                    subject_id,
                    state: current.state.to_string(),
                }
                .into(),
            );
        }
        let review_ref = match human_review_ref {
            Some(r) if !r.is_blank() => r,
            _ => {
                return self.reject(
                    opdo,
                    StateMachineViolation::HumanReviewRequired { subject_id }.into(),
                )
            }
        };
        let Some(stored_root) = current.composite_proof.as_ref().map(|p| p.merkle_root) else {
            return self.reject(
                opdo,
                StateMachineViolation::PrematureFinality {
                    subject_id,
                    reason: "no composite proof".into(),
                }
                .into(),
            );
        };

        let leaves = current.leaf_hashes()?;
        let computed = crate::merkle::merkle_root(&leaves).unwrap_or_else(ContentHash::zero);
        if computed != stored_root {
            return self.reject(
                opdo,
                CryptographicViolation::MerkleRootMismatch {
                    subject_id,
                    stored: stored_root,
                    computed,
                }
                .into(),
            );
        }
        let Some(final_hash) = current.compute_final_hash(&review_ref)? else {
            return self.reject(
                opdo,
                StateMachineViolation::PrematureFinality {
                    subject_id,
                    reason: "no composite proof".into(),
                }
                .into(),
            );
        };

        let actor = self.orchestrator.actor_id().clone();
        let mut finalizing = current;
        finalizing.human_review_ref = Some(review_ref.clone());
        finalizing.final_hash = Some(final_hash);
        self.commit(
            &mut records,
            finalizing,
            Step {
                entry_type: EntryType::FinalityFinalized,
                to: OpdoState::Final,
                trigger: "finalize",
                actor: &actor,
                review_ref: Some(&review_ref),
            },
            |_| {},
        )
    }

    /// Generic transition request. Only DRAFT → SEALED and SEALED → FINAL
    /// exist; everything else is refused and recorded.
    pub fn request_transition(
        &self,
        opdo: &OrchestratedPdo,
        to: OpdoState,
        human_review_ref: Option<ArtifactId>,
    ) -> FinalityResult<OrchestratedPdo> {
        let current = match self.get(&opdo.id)? {
            Some(current) => current,
            None => {
                return self.reject(
                    opdo,
                    StructuralViolation::UnknownSubject {
                        subject_id: opdo.id.to_string(),
                    }
                    .into(),
                )
            }
        };
        match (current.state, to) {
            (OpdoState::Draft, OpdoState::Sealed) => self.seal(opdo),
            (OpdoState::Sealed, OpdoState::Final) | (OpdoState::Draft, OpdoState::Final) => {
                self.finalize(opdo, human_review_ref)
            }
            (OpdoState::Final, _) => self.reject(
                opdo,
                StateMachineViolation::AlreadyFinal {
                    subject_id: opdo.id.to_string(),
                    state: current.state.to_string(),
                }
                .into(),
            ),
            _ => self.reject(opdo, self.illegal(&current, to)),
        }
    }

    pub fn get(&self, id: &OpdoId) -> FinalityResult<Option<OrchestratedPdo>> {
        let records = self.records.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    pub fn snapshot(&self) -> FinalityResult<Vec<OrchestratedPdo>> {
        let records = self.records.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn check_against_engine(&self, children: &[ChildPdo]) -> Result<(), Violation> {
        let Some(engine) = &self.pdo_engine else {
            return Ok(());
        };
        for child in children {
            let not_validated = |status: String| -> Violation {
                StructuralViolation::ChildNotValidated {
                    child_id: child.pdo_id.to_string(),
                    status,
                }
                .into()
            };
            let pdo = match engine.get(&child.pdo_id) {
                Ok(Some(pdo)) => pdo,
                Ok(None) => return Err(not_validated("UNKNOWN".into())),
                Err(_) => return Err(not_validated("UNREADABLE".into())),
            };
            if let Some(status) = pdo.child_refusal() {
                return Err(not_validated(status));
            }
            if pdo.content_hash().ok() != Some(child.content_hash) {
                return Err(not_validated("CONTENT_MISMATCH".into()));
            }
        }
        Ok(())
    }

    fn illegal(&self, current: &OrchestratedPdo, to: OpdoState) -> Violation {
        if current.state == OpdoState::Final {
            return StateMachineViolation::AlreadyFinal {
                subject_id: current.id.to_string(),
                state: current.state.to_string(),
            }
            .into();
        }
        StateMachineViolation::IllegalTransition {
            subject_id: current.id.to_string(),
            from: current.state.to_string(),
            to: to.to_string(),
        }
        .into()
    }

    fn write_records(&self) -> FinalityResult<RwLockWriteGuard<'_, Records>> {
        Ok(self.records.write().map_err(|_| LedgerError::LockPoisoned)?)
    }

    fn reject<T>(&self, opdo: &OrchestratedPdo, violation: Violation) -> FinalityResult<T> {
        self.reject_under(&opdo.id, Some(&opdo.task_ref), violation, BTreeMap::new())
    }

    fn reject_under<T>(
        &self,
        id: &OpdoId,
        task_ref: Option<&ArtifactId>,
        violation: Violation,
        evidence: BTreeMap<String, String>,
    ) -> FinalityResult<T> {
        let subject = ArtifactId::from(id);
        let entry = match task_ref {
            Some(parent) => self.recorder.record_rejection_under(
                &subject,
                ArtifactType::Opdo,
                parent,
                &violation,
                evidence,
            )?,
            None => self
                .recorder
                .record_rejection(&subject, ArtifactType::Opdo, &violation, evidence)?,
        };
        Err(FinalityError::Rejected {
            violation,
            sequence: entry.sequence,
        })
    }

    fn checkout(&self, records: &Records, snapshot: &OrchestratedPdo) -> FinalityResult<OrchestratedPdo> {
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
            Some(current) if current.state == OpdoState::Final => {
                StateMachineViolation::AlreadyFinal {
                    subject_id,
                    state: current.state.to_string(),
                }
                .into()
            }
            Some(current) => return Ok(current.clone()),
        };
        let task_ref = records.get(&snapshot.id).map(|o| &o.task_ref);
        self.reject_under(&snapshot.id, task_ref, violation, BTreeMap::new())
    }

    fn commit(
        &self,
        records: &mut Records,
        mut opdo: OrchestratedPdo,
        step: Step<'_>,
        apply: impl FnOnce(&mut OrchestratedPdo),
    ) -> FinalityResult<OrchestratedPdo> {
        let from = opdo.state;
        let entry = self.ledger.append(
            EntryDraft::new(
                step.entry_type,
                step.actor.clone(),
                &opdo.id,
                ArtifactType::Opdo,
                EntryPayload::OpdoTransition {
                    from: Some(from.as_str().into()),
                    to: step.to.as_str().into(),
                    version: opdo.version + 1,
                    merkle_root: opdo.composite_proof.as_ref().map(|p| p.merkle_root),
                    final_hash: opdo.final_hash,
                    human_review_ref: step.review_ref.cloned(),
                },
            )
            .with_parent(opdo.task_ref.clone()),
        )?;

        apply(&mut opdo);
        match step.to {
            OpdoState::Sealed => opdo.sealed_at = Some(entry.timestamp),
            OpdoState::Final => opdo.finalized_at = Some(entry.timestamp),
            OpdoState::Draft => {}
        }
        opdo.state = step.to;
        opdo.version += 1;
        opdo.state_history.push(OpdoTransition {
            from: Some(from),
            to: step.to,
            at: entry.timestamp,
            trigger: step.trigger.to_string(),
            actor: step.actor.clone(),
            ledger_sequence: entry.sequence,
        });
        records.insert(opdo.id.clone(), opdo.clone());

        info!(
            opdo = %opdo.id,
            from = %from,
            to = %step.to,
            version = opdo.version,
            sequence = entry.sequence,
            "opdo transition committed"
        );
        Ok(opdo)
    }
}

fn candidate_evidence(candidates: &[ChildPdo]) -> BTreeMap<String, String> {
    let ids: Vec<&str> = candidates.iter().map(|c| c.pdo_id.as_str()).collect();
    BTreeMap::from([
        ("candidate_count".to_string(), candidates.len().to_string()),
        ("candidates".to_string(), ids.join(",")),
    ])
}
