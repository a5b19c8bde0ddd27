//! Commands that append to the ledger

use super::{query::entry_line, Access, Context};
use crate::error::{CliResult, Status};
use crate::output::{colorize_violation, print_json, print_success, print_warning};
use clap::{Args, ValueEnum};
use finality_ledger::{ArtifactType, EntryDraft, EntryPayload, EntryType, LedgerEntry};
use finality_pdo::{ReviewApproval, ReviewPolicy, ReviewTiming};
use finality_types::{ArtifactId, StructuralViolation, Violation};
use std::collections::BTreeMap;
use tracing::debug;

/// Lifecycle event of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactEvent {
    Issued,
    Executed,
}

impl ArtifactEvent {
    pub fn entry_type(self) -> EntryType {
        match self {
            Self::Issued => EntryType::ArtifactIssued,
            Self::Executed => EntryType::ArtifactExecuted,
        }
    }
}

#[derive(Debug, Args)]
pub struct ArtifactArgs {
    /// Whether the artifact was issued or executed
    #[arg(long, value_enum)]
    pub event: ArtifactEvent,

    /// Actor that produced the artifact
    #[arg(long)]
    pub actor: String,

    /// Artifact identifier
    #[arg(long)]
    pub artifact: String,

    /// REQUEST, REVIEW, WORK_PRODUCT, CORRECTION, CLOSURE, PDO, OPDO or SIGNAL
    #[arg(long = "artifact-type")]
    pub artifact_type: ArtifactType,

    /// Parent artifact, e.g. the request a work product answers
    #[arg(long)]
    pub parent: Option<String>,

    /// Free-form status notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct RejectionArgs {
    /// Rejected artifact
    #[arg(long)]
    pub artifact: String,

    #[arg(long = "artifact-type")]
    pub artifact_type: ArtifactType,

    /// Who rejected it
    #[arg(long)]
    pub by: String,

    #[arg(long)]
    pub reason: String,

    #[arg(long)]
    pub parent: Option<String>,

    /// Supporting evidence as key=value; repeatable
    #[arg(long = "evidence", value_parser = parse_key_value)]
    pub evidence: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct ReviewArgs {
    /// Human reviewer
    #[arg(long)]
    pub reviewer: String,

    /// Identifier of the review record
    #[arg(long = "review-ref")]
    pub review_ref: String,

    /// Artifact the review covers. Its latest ledger entry marks when it
    /// was submitted; the approval is stamped when this command runs.
    #[arg(long)]
    pub subject: String,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn require(field: &str, value: &str) -> CliResult<()> {
    if value.trim().is_empty() {
        let violation: Violation = StructuralViolation::MissingField {
            subject: "command line".into(),
            field: field.into(),
        }
        .into();
        anyhow::bail!(violation);
    }
    Ok(())
}

fn report_entry(ctx: &Context, entry: &LedgerEntry) -> CliResult<()> {
    if ctx.json() {
        print_json(entry)
    } else {
        print_success(&format!("recorded {}", entry_line(entry)));
        println!("  entry hash: {}", entry.entry_hash.to_hex());
        Ok(())
    }
}

pub fn record_artifact(args: ArtifactArgs, ctx: &Context) -> CliResult<Status> {
    require("actor", &args.actor)?;
    require("artifact", &args.artifact)?;

    let ledger = ctx.open_ledger(Access::Write)?;
    let mut draft = EntryDraft::new(
        args.event.entry_type(),
        args.actor.as_str(),
        args.artifact.as_str(),
        args.artifact_type,
        EntryPayload::artifact(args.notes),
    );
    if let Some(parent) = args.parent {
        draft = draft.with_parent(parent);
    }
    let entry = ledger.append(draft)?;
    debug!(sequence = entry.sequence, "artifact event appended");
    report_entry(ctx, &entry)?;
    Ok(Status::Success)
}

pub fn record_rejection(args: RejectionArgs, ctx: &Context) -> CliResult<Status> {
    require("artifact", &args.artifact)?;
    require("by", &args.by)?;
    require("reason", &args.reason)?;

    let ledger = ctx.open_ledger(Access::Write)?;
    let recorder = ctx.recorder(ledger);
    let subject = ArtifactId::new(args.artifact);
    let violation: Violation = StructuralViolation::ExplicitRejection {
        by: args.by,
        reason: args.reason,
    }
    .into();
    let evidence: BTreeMap<String, String> = args.evidence.into_iter().collect();

    let entry = match args.parent {
        Some(parent) => recorder.record_rejection_under(
            &subject,
            args.artifact_type,
            &ArtifactId::new(parent),
            &violation,
            evidence,
        )?,
        None => recorder.record_rejection(&subject, args.artifact_type, &violation, evidence)?,
    };
    report_entry(ctx, &entry)?;
    Ok(Status::Success)
}

/// Apply the configured latency gate, then record either the completed
/// review or the gate failure. Both times come from the ledger.
pub fn record_review(args: ReviewArgs, ctx: &Context) -> CliResult<Status> {
    require("reviewer", &args.reviewer)?;
    require("review-ref", &args.review_ref)?;
    require("subject", &args.subject)?;

    let approval = ReviewApproval::new(args.reviewer.as_str(), args.review_ref.as_str());
    let policy = ReviewPolicy::from_millis(ctx.config.review.minimum_latency_ms);
    let ledger = ctx.open_ledger(Access::Write)?;
    let subject = ArtifactId::new(args.subject);

    let submitted_at = ledger.with_snapshot(|entries| {
        entries
            .iter()
            .rev()
            .find(|e| e.artifact_id == subject)
            .map(|e| e.timestamp)
    })?;
    let Some(submitted_at) = submitted_at else {
        let violation: Violation = StructuralViolation::UnknownSubject {
            subject_id: subject.to_string(),
        }
        .into();
        let evidence = BTreeMap::from([("reviewer".to_string(), approval.reviewer.to_string())]);
        let entry = ctx.recorder(ledger).record_rejection_under(
            &approval.review_ref,
            ArtifactType::Review,
            &subject,
            &violation,
            evidence,
        )?;
        report_refusal(ctx, "review refused", &violation, &entry)?;
        return Ok(Status::Failed);
    };
    let timing = ReviewTiming::new(submitted_at, ledger.now());
    debug!(
        subject = %subject,
        latency_ms = timing.latency().num_milliseconds(),
        "review timing stamped"
    );

    match policy.evaluate(&timing) {
        Ok(()) => {
            let entry = ledger.append(
                EntryDraft::new(
                    EntryType::ReviewCompleted,
                    approval.reviewer.clone(),
                    approval.review_ref.clone(),
                    ArtifactType::Review,
                    EntryPayload::Review {
                        reviewer: approval.reviewer,
                        review_ref: approval.review_ref,
                        submitted_at: timing.submitted_at,
                        approved_at: timing.approved_at,
                        latency_ms: timing.latency().num_milliseconds(),
                    },
                )
                .with_parent(subject),
            )?;
            report_entry(ctx, &entry)?;
            Ok(Status::Success)
        }
        Err(violation) => {
            let evidence = BTreeMap::from([
                ("reviewer".to_string(), approval.reviewer.to_string()),
                ("submitted_at".to_string(), timing.submitted_at.to_rfc3339()),
                ("approved_at".to_string(), timing.approved_at.to_rfc3339()),
            ]);
            let entry = ctx.recorder(ledger).record_rejection_under(
                &approval.review_ref,
                ArtifactType::Review,
                &subject,
                &violation,
                evidence,
            )?;
            report_refusal(ctx, "review gate failed", &violation, &entry)?;
            Ok(Status::Failed)
        }
    }
}

fn report_refusal(
    ctx: &Context,
    headline: &str,
    violation: &Violation,
    entry: &LedgerEntry,
) -> CliResult<()> {
    if ctx.json() {
        print_json(entry)
    } else {
        print_warning(&format!("{headline}: {}", colorize_violation(violation)));
        println!("  recorded {}", entry_line(entry));
        Ok(())
    }
}
