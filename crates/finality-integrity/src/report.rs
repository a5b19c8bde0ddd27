use chrono::{DateTime, Utc};
use finality_ledger::ChainVerification;
use finality_types::{
    hash_canonical, CanonicalError, ContentHash, HashDomain, Violation, ViolationFamily,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which audit pass produced a finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCheck {
    HashChain,
    CompositeProof,
    LifecycleCompleteness,
    Reachability,
}

impl AuditCheck {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HashChain => "hash_chain",
            Self::CompositeProof => "composite_proof",
            Self::LifecycleCompleteness => "lifecycle_completeness",
            Self::Reachability => "reachability",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub check: AuditCheck,
    /// Ledger sequence, PDO id or O-PDO id.
    pub subject: String,
    pub violation: Violation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    IntegrityVerified,
    ValidationFailed,
    TamperingDetected,
}

impl Verdict {
    /// Any cryptographic finding is tampering; anything else is a
    /// validation failure.
    pub fn from_findings(findings: &[Finding]) -> Self {
        if findings
            .iter()
            .any(|f| f.violation.family() == ViolationFamily::Cryptographic)
        {
            Self::TamperingDetected
        } else if findings.is_empty() {
            Self::IntegrityVerified
        } else {
            Self::ValidationFailed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IntegrityVerified => "INTEGRITY_VERIFIED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::TamperingDetected => "TAMPERING_DETECTED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub generated_at: DateTime<Utc>,
    pub total_entries: usize,
    pub chain: ChainVerification,
    pub pdos_checked: usize,
    pub opdos_checked: usize,
    pub findings: Vec<Finding>,
    pub verdict: Verdict,
}

#[derive(Serialize)]
struct Fingerprinted<'a> {
    total_entries: usize,
    chain: &'a ChainVerification,
    pdos_checked: usize,
    opdos_checked: usize,
    findings: &'a [Finding],
    verdict: Verdict,
}

impl IntegrityReport {
    pub fn new(
        total_entries: usize,
        chain: ChainVerification,
        pdos_checked: usize,
        opdos_checked: usize,
        findings: Vec<Finding>,
    ) -> Self {
        let verdict = Verdict::from_findings(&findings);
        Self {
            generated_at: Utc::now(),
            total_entries,
            chain,
            pdos_checked,
            opdos_checked,
            findings,
            verdict,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verdict == Verdict::IntegrityVerified
    }

    pub fn findings_for(&self, check: AuditCheck) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.check == check)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.findings.iter().map(|f| f.violation.code()).collect()
    }

    /// Digest of everything except `generated_at`. Two audits of the same
    /// store produce the same fingerprint.
    pub fn fingerprint(&self) -> Result<ContentHash, CanonicalError> {
        hash_canonical(
            HashDomain::ReportFingerprint,
            &Fingerprinted {
                total_entries: self.total_entries,
                chain: &self.chain,
                pdos_checked: self.pdos_checked,
                opdos_checked: self.opdos_checked,
                findings: &self.findings,
                verdict: self.verdict,
            },
        )
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Integrity audit: {}", self.verdict)?;
        writeln!(
            f,
            "  entries: {}  pdos: {}  opdos: {}  findings: {}",
            self.total_entries,
            self.pdos_checked,
            self.opdos_checked,
            self.findings.len()
        )?;
        if let Some(head) = &self.chain.head_hash {
            writeln!(f, "  head: {}", head.to_hex())?;
        }
        if let Some(seq) = self.chain.first_break {
            writeln!(f, "  first break at sequence {seq}")?;
        }
        for finding in &self.findings {
            writeln!(
                f,
                "  [{}] {}: {}",
                finding.check.as_str(),
                finding.subject,
                finding.violation
            )?;
        }
        Ok(())
    }
}
