use thiserror::Error;

use stockledger_core::DomainError;

use crate::ledger::LedgerError;

pub type StockResult<T> = Result<T, StockError>;

/// Service-level error.
///
/// Proof failures are kept apart from every other ledger error so callers can
/// tell "record absent" from "record present but untrusted".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Verification(String),

    #[error(transparent)]
    Ledger(LedgerError),
}

impl StockError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<LedgerError> for StockError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::VerificationFailed(msg) => Self::Verification(msg),
            other => Self::Ledger(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_failures_are_not_generic_ledger_errors() {
        let err: StockError = LedgerError::VerificationFailed("bad proof".into()).into();
        assert_eq!(err, StockError::Verification("bad proof".into()));

        let err: StockError = LedgerError::KeyNotFound.into();
        assert_eq!(err, StockError::Ledger(LedgerError::KeyNotFound));
    }
}
