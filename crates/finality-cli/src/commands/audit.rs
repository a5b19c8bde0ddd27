//! Reporting, integrity validation and invariant drills

use super::{Access, Context};
use crate::error::{CliResult, Status};
use crate::output::{colorize_violation, print_json, print_success, print_warning};
use colored::*;
use finality_integrity::{run_drills, IntegrityVerifier, Verdict};
use finality_ledger::AuditReport;
use std::collections::BTreeMap;

fn print_distribution(title: &str, counts: &BTreeMap<String, usize>) {
    println!("{title}:");
    for (key, count) in counts {
        println!("  {key:<28} {count}");
    }
}

fn print_report(report: &AuditReport) {
    println!("{}", "Ledger Audit Report".bold());
    println!("-------------------");
    println!("Total entries: {}", report.total_entries);
    if let (Some(first), Some(last)) = (report.first_entry_at, report.last_entry_at) {
        println!("Period: {} .. {}", first.to_rfc3339(), last.to_rfc3339());
    }
    println!("Rejections: {}", report.rejections);
    println!("Blocks: {}", report.blocks);
    println!("Gate failures: {}", report.gate_failures);
    println!(
        "Validations: {} passed, {} failed",
        report.validations_passed, report.validations_failed
    );
    println!("Finalized: {}", report.finalized);
    if let Some(head) = &report.head_hash {
        println!("Head: {}", head.to_hex());
    }
    println!();
    print_distribution("By entry type", &report.by_entry_type);
    print_distribution("By actor", &report.by_actor);
    print_distribution("By artifact type", &report.by_artifact_type);
}

pub fn report(ctx: &Context) -> CliResult<Status> {
    let ledger = ctx.open_ledger(Access::Read)?;
    let report = ledger.report()?;
    if ctx.json() {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(Status::Success)
}

/// Audit the ledger file. Opens without verification so a broken chain is
/// reported instead of refused.
pub fn validate(ctx: &Context) -> CliResult<Status> {
    let ledger = ctx.open_ledger(Access::Audit)?;
    let report = IntegrityVerifier::new(ledger).audit()?;

    if ctx.json() {
        print_json(&report)?;
    } else {
        match report.verdict {
            Verdict::IntegrityVerified => print_success(&format!(
                "{} ({} entries)",
                report.verdict, report.total_entries
            )),
            _ => print_warning(&report.verdict.as_str().red().bold().to_string()),
        }
        if let Some(seq) = report.chain.first_break {
            println!("  first break at sequence {seq}");
        }
        for finding in &report.findings {
            println!(
                "  [{}] {}: {}",
                finding.check.as_str(),
                finding.subject,
                colorize_violation(&finding.violation)
            );
        }
        if let Ok(fingerprint) = report.fingerprint() {
            println!("  fingerprint: {}", fingerprint.to_hex().dimmed());
        }
    }

    Ok(match report.verdict {
        Verdict::IntegrityVerified => Status::Success,
        Verdict::ValidationFailed => Status::Failed,
        Verdict::TamperingDetected => Status::Tampered,
    })
}

pub fn drill(ctx: &Context) -> CliResult<Status> {
    let suite = run_drills();
    if ctx.json() {
        print_json(&suite)?;
    } else {
        print!("{suite}");
    }
    Ok(if suite.all_passed() {
        Status::Success
    } else {
        Status::Failed
    })
}

/// Print the effective configuration.
pub fn show_config(ctx: &Context) -> CliResult<Status> {
    let config = &ctx.config;
    if ctx.json() {
        print_json(config)?;
        return Ok(Status::Success);
    }
    println!("Ledger: {}", config.ledger.path);
    println!("Verify on open: {}", config.ledger.verify_on_open);
    println!("Decision authority: {}", config.authority.decision_authority);
    println!("Orchestrator: {}", config.authority.orchestrator);
    println!("Recorder actor: {}", config.authority.recorder_actor);
    println!("Minimum review latency: {}ms", config.review.minimum_latency_ms);
    println!(
        "Logging: {}{}",
        config.logging.level,
        if config.logging.json { " (json)" } else { "" }
    );
    Ok(Status::Success)
}
