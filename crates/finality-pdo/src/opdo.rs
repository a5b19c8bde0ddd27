use crate::graph::find_cycle;
use crate::merkle::CompositeProof;
use chrono::{DateTime, Utc};
use finality_types::{
    hash_canonical, ActorId, ArtifactId, AuthorityIdentity, CanonicalError, ContentHash,
    HashDomain, OpdoId, PdoId, SequencingViolation, StructuralViolation, Violation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildStatus {
    Validated,
    Pending,
    Rejected,
}

impl ChildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validated => "VALIDATED",
            Self::Pending => "PENDING",
            Self::Rejected => "REJECTED",
        }
    }
}

/// A finalized PDO as it enters an O-PDO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPdo {
    pub pdo_id: PdoId,
    pub contributor: ActorId,
    pub source_task: ArtifactId,
    /// Ledger artifact that validated this child.
    pub validation_record: Option<ArtifactId>,
    pub status: ChildStatus,
    pub content_hash: ContentHash,
    /// Other children that must be present alongside this one.
    pub dependencies: Vec<PdoId>,
}

impl ChildPdo {
    pub fn new(
        pdo_id: PdoId,
        contributor: impl Into<ActorId>,
        source_task: impl Into<ArtifactId>,
        content_hash: ContentHash,
    ) -> Self {
        Self {
            pdo_id,
            contributor: contributor.into(),
            source_task: source_task.into(),
            validation_record: None,
            status: ChildStatus::Validated,
            content_hash,
            dependencies: Vec::new(),
        }
    }

    pub fn with_validation_record(mut self, record: impl Into<ArtifactId>) -> Self {
        self.validation_record = Some(record.into());
        self
    }

    pub fn with_status(mut self, status: ChildStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<PdoId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Merkle leaf; binds every field of the child.
    pub fn leaf_hash(&self) -> Result<ContentHash, CanonicalError> {
        hash_canonical(HashDomain::ChildLeaf, self)
    }
}

/// Check a candidate child set before binding.
///
/// Order: emptiness, per-child fields and status, duplicates, then the
/// dependency graph.
pub fn validate_children(children: &[ChildPdo]) -> Result<(), Violation> {
    if children.is_empty() {
        return Err(StructuralViolation::EmptyChildSet.into());
    }

    for child in children {
        if child.pdo_id.is_blank() {
            return Err(StructuralViolation::MissingField {
                subject: "child".into(),
                field: "pdo_id".into(),
            }
            .into());
        }
        if child.contributor.is_blank() {
            return Err(StructuralViolation::MissingField {
                subject: child.pdo_id.to_string(),
                field: "contributor".into(),
            }
            .into());
        }
        if child.status != ChildStatus::Validated {
            return Err(StructuralViolation::ChildNotValidated {
                child_id: child.pdo_id.to_string(),
                status: child.status.as_str().into(),
            }
            .into());
        }
        if child.validation_record.as_ref().map_or(true, ArtifactId::is_blank) {
            return Err(StructuralViolation::MissingValidationRecord {
                child_id: child.pdo_id.to_string(),
            }
            .into());
        }
    }

    let mut seen_children = BTreeSet::new();
    let mut seen_contributors = BTreeSet::new();
    for child in children {
        if !seen_children.insert(&child.pdo_id) {
            return Err(StructuralViolation::DuplicateChild {
                child_id: child.pdo_id.to_string(),
            }
            .into());
        }
        if !seen_contributors.insert(&child.contributor) {
            return Err(StructuralViolation::DuplicateContributor {
                actor_id: child.contributor.to_string(),
                child_id: child.pdo_id.to_string(),
            }
            .into());
        }
    }

    if let Some(path) = find_cycle(children) {
        return Err(SequencingViolation::CycleDetected {
            path: path.iter().map(PdoId::to_string).collect(),
        }
        .into());
    }

    for child in children {
        if let Some(dependency) = child
            .dependencies
            .iter()
            .find(|d| !seen_children.contains(d))
        {
            return Err(StructuralViolation::MissingDependency {
                child_id: child.pdo_id.to_string(),
                dependency: dependency.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpdoState {
    Draft,
    Sealed,
    Final,
}

impl OpdoState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sealed => "SEALED",
            Self::Final => "FINAL",
        }
    }

    /// Exactly DRAFT → SEALED → FINAL.
    pub fn can_transition(self, to: OpdoState) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Sealed) | (Self::Sealed, Self::Final)
        )
    }

    pub fn required_path(self) -> Vec<OpdoState> {
        match self {
            Self::Draft => vec![Self::Draft],
            Self::Sealed => vec![Self::Draft, Self::Sealed],
            Self::Final => vec![Self::Draft, Self::Sealed, Self::Final],
        }
    }
}

impl fmt::Display for OpdoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpdoTransition {
    pub from: Option<OpdoState>,
    pub to: OpdoState,
    pub at: DateTime<Utc>,
    pub trigger: String,
    pub actor: ActorId,
    pub ledger_sequence: u64,
}

/// Orchestrated PDO: a sealed, Merkle-committed bundle of finalized PDOs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratedPdo {
    pub id: OpdoId,
    pub task_ref: ArtifactId,
    pub orchestrator: AuthorityIdentity,
    pub child_pdos: Vec<ChildPdo>,
    pub composite_proof: Option<CompositeProof>,
    pub state: OpdoState,
    pub state_history: Vec<OpdoTransition>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub sealed_at: Option<DateTime<Utc>>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub human_review_ref: Option<ArtifactId>,
    pub final_hash: Option<ContentHash>,
}

#[derive(Serialize)]
struct FinalHashInput<'a> {
    id: &'a OpdoId,
    task_ref: &'a ArtifactId,
    merkle_root: &'a ContentHash,
    child_count: usize,
    sealed_at: &'a Option<DateTime<Utc>>,
    human_review_ref: &'a ArtifactId,
}

impl OrchestratedPdo {
    /// Sorted leaf hashes of the current child set.
    pub fn leaf_hashes(&self) -> Result<Vec<ContentHash>, CanonicalError> {
        let mut leaves = self
            .child_pdos
            .iter()
            .map(ChildPdo::leaf_hash)
            .collect::<Result<Vec<_>, _>>()?;
        leaves.sort();
        Ok(leaves)
    }

    /// Hash binding the sealed root to the reviewing human. `None` before
    /// a composite proof exists.
    pub fn compute_final_hash(
        &self,
        human_review_ref: &ArtifactId,
    ) -> Result<Option<ContentHash>, CanonicalError> {
        let Some(proof) = &self.composite_proof else {
            return Ok(None);
        };
        hash_canonical(
            HashDomain::FinalHash,
            &FinalHashInput {
                id: &self.id,
                task_ref: &self.task_ref,
                merkle_root: &proof.merkle_root,
                child_count: self.child_pdos.len(),
                sealed_at: &self.sealed_at,
                human_review_ref,
            },
        )
        .map(Some)
    }

    pub fn contributors(&self) -> impl Iterator<Item = &ActorId> {
        self.child_pdos.iter().map(|c| &c.contributor)
    }
}
