use crate::entry::{ArtifactType, EntryType, LedgerEntry};
use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use finality_types::{ActorId, ArtifactId};

/// Composable query over ledger entries. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct LedgerFilter {
    pub actor: Option<ActorId>,
    pub entry_type: Option<EntryType>,
    pub artifact: Option<ArtifactId>,
    pub artifact_type: Option<ArtifactType>,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl LedgerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    /// Matches the artifact itself or any entry naming it as parent.
    pub fn with_artifact(mut self, artifact: impl Into<ArtifactId>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    pub fn with_artifact_type(mut self, artifact_type: ArtifactType) -> Self {
        self.artifact_type = Some(artifact_type);
        self
    }

    /// Inclusive on both ends.
    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.time_range = Some((from, to));
        self
    }

    /// Like [`with_time_range`](Self::with_time_range), refusing an
    /// inverted range.
    pub fn try_time_range(self, from: DateTime<Utc>, to: DateTime<Utc>) -> LedgerResult<Self> {
        if from > to {
            return Err(LedgerError::InvalidRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(self.with_time_range(from, to))
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(ref actor) = self.actor {
            if entry.actor_id != *actor {
                return false;
            }
        }

        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }

        if let Some(ref artifact) = self.artifact {
            if !entry.references(artifact) {
                return false;
            }
        }

        if let Some(artifact_type) = self.artifact_type {
            if entry.artifact_type != artifact_type {
                return false;
            }
        }

        if let Some((from, to)) = self.time_range {
            if entry.timestamp < from || entry.timestamp > to {
                return false;
            }
        }

        true
    }
}
