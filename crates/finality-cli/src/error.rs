//! Process exit statuses

use finality_ledger::LedgerError;
use std::process::ExitCode;

pub type CliResult<T> = anyhow::Result<T>;

/// Exit code for anything that stopped the command from running.
pub const RUNTIME_ERROR: u8 = 1;

/// How a command that ran to completion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Validation failure, blocked signal or failed gate.
    Failed,
    /// Hash or proof mismatch.
    Tampered,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed => 2,
            Self::Tampered => 3,
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.code())
    }
}

/// A ledger refused on open because its chain is broken is tampering, not a
/// runtime error.
pub fn failure_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<LedgerError>() {
        Some(LedgerError::IntegrityFailure { .. }) => Status::Tampered.code(),
        _ => RUNTIME_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn status_codes() {
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Failed.code(), 2);
        assert_eq!(Status::Tampered.code(), 3);
    }

    #[test]
    fn integrity_failure_maps_to_tampered() {
        let err: Result<(), LedgerError> = Err(LedgerError::IntegrityFailure {
            violations: 2,
            first_break: Some(4),
        });
        let err = err.context("failed to open ledger").unwrap_err();
        assert_eq!(failure_code(&err), 3);

        let err = anyhow::Error::from(LedgerError::ReadOnly);
        assert_eq!(failure_code(&err), RUNTIME_ERROR);
        assert_eq!(failure_code(&anyhow::anyhow!("bad flag")), RUNTIME_ERROR);
    }
}
