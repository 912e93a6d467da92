use ethc_api::error::LedgerError;
use ethc_client::{Transient, WalletError};
use thiserror::Error;

/// Conditions that stop an attempt outright. Abstentions and failed transactions are not
/// errors; they come back as a [`crate::SessionOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    #[error("Ledger unavailable during {operation}: {cause}")]
    LedgerUnavailable { operation: String, cause: String },
    #[error("No wallet found with name: {0}")]
    UnknownWallet(String),
    #[error("Remote invariant violated in {operation}: {detail}")]
    RemoteInvariantViolation { operation: String, detail: String },
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl MiningError {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LedgerUnavailable { .. } => "LedgerUnavailable",
            Self::UnknownWallet(_) => "UnknownWallet",
            Self::RemoteInvariantViolation { .. } => "RemoteInvariantViolation",
            Self::Signing(_) => "Signing",
        }
    }

    /// Only connectivity problems are worth repeating without operator attention.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable { .. })
    }
}

impl From<LedgerError> for MiningError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Transient { operation, cause } => Self::LedgerUnavailable { operation, cause },
            LedgerError::InvariantViolation { operation, detail } => {
                Self::RemoteInvariantViolation { operation, detail }
            }
            // A read the node refuses outright means the contract is not what we expect.
            LedgerError::Rejected { operation, message } => Self::RemoteInvariantViolation {
                operation,
                detail: message,
            },
        }
    }
}

impl From<WalletError> for MiningError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UnknownWallet(name) => Self::UnknownWallet(name),
            other => Self::Signing(other.to_string()),
        }
    }
}

impl Transient for MiningError {
    fn is_transient(&self) -> bool {
        self.is_retriable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_mapping() {
        let err: MiningError = LedgerError::transient("blockNumber", "connection refused").into();
        assert!(err.is_retriable());
        assert_eq!(err.to_string(), "Ledger unavailable during blockNumber: connection refused");

        let err: MiningError = LedgerError::invariant("minersOfBlock", "short list").into();
        assert!(!err.is_retriable());
        assert_eq!(err.label(), "RemoteInvariantViolation");
        assert!(matches!(err, MiningError::RemoteInvariantViolation { operation, .. } if operation == "minersOfBlock"));
    }

    #[test]
    fn test_wallet_error_mapping() {
        let err: MiningError = WalletError::UnknownWallet("Wallet 9".to_string()).into();
        assert_eq!(err, MiningError::UnknownWallet("Wallet 9".to_string()));

        let err: MiningError = WalletError::Signing { name: "w".to_string(), reason: "bad".to_string() }.into();
        assert!(matches!(err, MiningError::Signing(_)));
        assert!(!err.is_retriable());
    }
}
