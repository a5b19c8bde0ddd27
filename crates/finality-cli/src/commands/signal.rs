//! Boundary rule checks

use super::{Access, Context};
use crate::error::{CliResult, Status};
use crate::output::{colorize_violation, print_json, print_success, print_warning};
use clap::Args;
use finality_ledger::ArtifactType;
use finality_rules::{RuleEngine, Verdict};
use finality_types::{ArtifactId, Violation};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Args)]
pub struct SignalArgs {
    /// Signal class, e.g. AUTHORITATIVE, ADVISORY or HUMAN_APPROVED
    #[arg(long)]
    pub signal: String,

    /// Destination to check the signal against
    #[arg(long, required_unless_present = "source_layer", conflicts_with = "source_layer")]
    pub destination: Option<String>,

    /// Layer the signal leaves
    #[arg(long = "source-layer", requires = "target_layer")]
    pub source_layer: Option<String>,

    /// Layer the signal enters
    #[arg(long = "target-layer", requires = "source_layer")]
    pub target_layer: Option<String>,

    /// Record a block against this artifact
    #[arg(long)]
    pub subject: Option<String>,
}

#[derive(Serialize)]
struct SignalCheck<'a> {
    rule_table: &'static str,
    signal: &'a str,
    route: String,
    verdict: &'a Verdict,
    recorded_at: Option<u64>,
}

pub fn execute(args: SignalArgs, ctx: &Context) -> CliResult<Status> {
    let engine = RuleEngine::new();
    let (route, verdict) = match (&args.destination, &args.source_layer, &args.target_layer) {
        (Some(destination), None, None) => (
            destination.clone(),
            engine.check_transition_named(&args.signal, destination),
        ),
        (None, Some(source), Some(target)) => (
            format!("{source} -> {target}"),
            engine.check_boundary_named(source, target, &args.signal),
        ),
        _ => anyhow::bail!("give either --destination or both --source-layer and --target-layer"),
    };

    let mut recorded_at = None;
    if let (Verdict::Block { violation }, Some(subject)) = (&verdict, &args.subject) {
        let ledger = ctx.open_ledger(Access::Write)?;
        let violation: Violation = violation.clone().into();
        let entry = ctx.recorder(ledger).record_rejection(
            &ArtifactId::new(subject.as_str()),
            ArtifactType::Signal,
            &violation,
            BTreeMap::from([
                ("signal".to_string(), args.signal.clone()),
                ("route".to_string(), route.clone()),
            ]),
        )?;
        recorded_at = Some(entry.sequence);
    }

    if ctx.json() {
        print_json(&SignalCheck {
            rule_table: engine.version(),
            signal: &args.signal,
            route,
            verdict: &verdict,
            recorded_at,
        })?;
    } else {
        match &verdict {
            Verdict::Allow {
                requires_human_review: true,
            } => print_success(&format!(
                "ALLOW {} -> {route} (requires human review)",
                args.signal
            )),
            Verdict::Allow { .. } => print_success(&format!("ALLOW {} -> {route}", args.signal)),
            Verdict::Block { violation } => {
                let violation: Violation = violation.clone().into();
                print_warning(&format!("BLOCK {}", colorize_violation(&violation)));
                if let Some(sequence) = recorded_at {
                    println!("  block recorded at sequence {sequence}");
                }
            }
        }
    }

    Ok(if verdict.is_allowed() {
        Status::Success
    } else {
        Status::Failed
    })
}
