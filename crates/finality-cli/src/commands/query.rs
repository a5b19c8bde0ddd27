//! Ledger queries

use super::{Access, Context};
use crate::error::{CliResult, Status};
use crate::output::{colorize_violation, print_json};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::*;
use finality_ledger::{ArtifactType, EntryType, LedgerEntry, LedgerFilter};

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Only entries produced by this actor
    #[arg(long)]
    pub actor: Option<String>,

    /// Only entries of this type, e.g. REJECTION_RECORDED
    #[arg(long = "type")]
    pub entry_type: Option<EntryType>,

    /// Only entries about this artifact or its children
    #[arg(long)]
    pub artifact: Option<String>,

    #[arg(long = "artifact-type")]
    pub artifact_type: Option<ArtifactType>,

    /// Inclusive lower bound (RFC 3339)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Inclusive upper bound (RFC 3339)
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,

    /// Show at most this many of the most recent matches
    #[arg(long)]
    pub limit: Option<usize>,
}

impl QueryArgs {
    pub fn filter(&self) -> CliResult<LedgerFilter> {
        let mut filter = LedgerFilter::new();
        if let Some(actor) = &self.actor {
            filter = filter.with_actor(actor.as_str());
        }
        if let Some(entry_type) = self.entry_type {
            filter = filter.with_type(entry_type);
        }
        if let Some(artifact) = &self.artifact {
            filter = filter.with_artifact(artifact.as_str());
        }
        if let Some(artifact_type) = self.artifact_type {
            filter = filter.with_artifact_type(artifact_type);
        }
        if self.since.is_some() || self.until.is_some() {
            filter = filter.try_time_range(
                self.since.unwrap_or(DateTime::<Utc>::MIN_UTC),
                self.until.unwrap_or(DateTime::<Utc>::MAX_UTC),
            )?;
        }
        Ok(filter)
    }
}

/// One-line summary of an entry.
pub fn entry_line(entry: &LedgerEntry) -> String {
    let mut line = format!(
        "#{} {} {} {} ({}) by {}",
        entry.sequence,
        entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        entry.entry_type,
        entry.artifact_id,
        entry.artifact_type,
        entry.actor_id
    );
    if let Some(parent) = &entry.parent_artifact {
        line.push_str(&format!(" under {parent}"));
    }
    line
}

pub fn execute(args: QueryArgs, ctx: &Context) -> CliResult<Status> {
    let filter = args.filter()?;
    let ledger = ctx.open_ledger(Access::Read)?;
    let mut entries = ledger.query(&filter)?;
    if let Some(limit) = args.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    if ctx.json() {
        print_json(&entries)?;
        return Ok(Status::Success);
    }

    if entries.is_empty() {
        println!("{}", "No matching entries".dimmed());
        return Ok(Status::Success);
    }
    for entry in &entries {
        println!("{}", entry_line(entry));
        if let Some(violation) = entry.payload.violation() {
            println!("    {}", colorize_violation(violation));
        }
    }
    println!("{}", format!("{} entries", entries.len()).dimmed());
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use finality_ledger::LedgerError;

    fn args() -> QueryArgs {
        QueryArgs {
            actor: None,
            entry_type: None,
            artifact: None,
            artifact_type: None,
            since: None,
            until: None,
            limit: None,
        }
    }

    #[test]
    fn inverted_range_is_refused() {
        let now = Utc::now();
        let query = QueryArgs {
            since: Some(now),
            until: Some(now - Duration::hours(1)),
            ..args()
        };
        let err = query.filter().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidRange { .. })
        ));
    }

    #[test]
    fn open_ended_range_is_accepted() {
        let query = QueryArgs {
            since: Some(Utc::now()),
            ..args()
        };
        assert!(query.filter().is_ok());
        assert!(args().filter().is_ok());
    }
}
