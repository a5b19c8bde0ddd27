//! Top-level integrity auditor.
//!
//! [`IntegrityVerifier::audit`] replays the whole store and reports:
//! - hash-chain breaks (delegated to the ledger's chain walk),
//! - O-PDO composite proofs and final hashes that no longer match their
//!   children,
//! - PDO/O-PDO states with missing ledger entries for a prior state,
//! - records not reachable from the intact part of the chain.
//!
//! The verifier only reads. Re-running it against the same store yields the
//! same [`IntegrityReport::fingerprint`].

pub mod drills;
pub mod error;
pub mod report;
pub mod verifier;

pub use drills::{run_drills, DrillResult, DrillSuite};
pub use error::{IntegrityError, IntegrityResult};
pub use report::{AuditCheck, Finding, IntegrityReport, Verdict};
pub use verifier::IntegrityVerifier;
