use finality_ledger::LedgerError;
use finality_pdo::FinalityError;
use finality_types::CanonicalError;
use thiserror::Error;

/// The audit could not run. Findings are never errors; they go in the
/// report.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),

    #[error("record store unavailable: {0}")]
    Records(#[from] FinalityError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

pub type IntegrityResult<T> = Result<T, IntegrityError>;
