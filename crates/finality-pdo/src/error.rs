use finality_ledger::{LedgerError, SystemFault};
use finality_types::{CanonicalError, Violation};
use thiserror::Error;

/// Errors from the PDO engine and the O-PDO composer.
#[derive(Debug, Error)]
pub enum FinalityError {
    /// Refused; the refusal is already committed at `sequence`.
    #[error("rejected (recorded at ledger sequence {sequence}): {violation}")]
    Rejected { violation: Violation, sequence: u64 },

    /// Refused, but the refusal could not be recorded.
    #[error(transparent)]
    SystemFault(#[from] SystemFault),

    /// A success-path append failed; nothing was committed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

impl FinalityError {
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Rejected { violation, .. } => Some(violation),
            Self::SystemFault(fault) => Some(&fault.violation),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        self.violation().map(Violation::code)
    }

    pub fn is_system_fault(&self) -> bool {
        matches!(self, Self::SystemFault(_))
    }
}

pub type FinalityResult<T> = Result<T, FinalityError>;
