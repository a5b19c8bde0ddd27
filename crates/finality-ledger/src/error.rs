use finality_types::{ArtifactId, CanonicalError, Violation};
use thiserror::Error;

/// Errors returned by the ledger store and its backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("ledger is open read-only; append refused")]
    ReadOnly,

    #[error("corrupt ledger record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("ledger failed verification on open: {violations} violation(s), first break at {first_break:?}")]
    IntegrityFailure {
        violations: usize,
        first_break: Option<u64>,
    },

    #[error("ledger lock poisoned")]
    LockPoisoned,

    #[error("ledger halted after a failed write ({reason}); reopen to resume")]
    Halted { reason: String },

    #[error("ledger sequence space exhausted after {last}")]
    SequenceExhausted { last: u64 },

    #[error("invalid time range: {from} is after {to}")]
    InvalidRange { from: String, to: String },
}

impl From<CanonicalError> for LedgerError {
    fn from(err: CanonicalError) -> Self {
        Self::Serialization(err.0)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// A rejection that could not be made durable.
///
/// Raised instead of the original rejection; the caller must treat it as a
/// system failure, never as a recorded refusal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("system fault: rejection of {subject_id} [{violation}] could not be recorded: {source}")]
pub struct SystemFault {
    pub subject_id: ArtifactId,
    pub violation: Violation,
    pub source: LedgerError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use finality_types::StructuralViolation;

    #[test]
    fn error_display() {
        assert_eq!(
            LedgerError::ReadOnly.to_string(),
            "ledger is open read-only; append refused"
        );
        let err = LedgerError::Corrupt {
            line: 3,
            reason: "eof".into(),
        };
        assert_eq!(err.to_string(), "corrupt ledger record at line 3: eof");
        let halted = LedgerError::Halted {
            reason: "storage error: disk full".into(),
        };
        assert!(halted.to_string().contains("disk full"));
        assert!(halted.to_string().contains("reopen"));
    }

    #[test]
    fn system_fault_names_both_causes() {
        let fault = SystemFault {
            subject_id: ArtifactId::new("PDO-1"),
            violation: StructuralViolation::EmptyChildSet.into(),
            source: LedgerError::ReadOnly,
        };
        let msg = fault.to_string();
        assert!(msg.contains("PDO-1"));
        assert!(msg.contains("GS_400"));
        assert!(msg.contains("read-only"));
        assert!(std::error::Error::source(&fault).is_some());
    }
}
