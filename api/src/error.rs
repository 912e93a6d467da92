use thiserror::Error;

/// Failure of a single remote read or write against the ledger node or the mining contract.
///
/// Every variant names the operation that failed so callers can decide whether a retry makes
/// sense without parsing messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The node could not be reached or timed out. Safe to retry reads with backoff.
    #[error("{operation} failed: {cause}")]
    Transient { operation: String, cause: String },

    /// The node answered with an error for the request (bad nonce, underpriced fee, revert).
    #[error("node rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    /// The node or contract answered with data that contradicts what the miner relies on.
    #[error("unexpected response from {operation}: {detail}")]
    InvariantViolation { operation: String, detail: String },
}

impl LedgerError {
    pub fn transient(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::Transient { operation: operation.into(), cause: cause.to_string() }
    }

    pub fn rejected(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Rejected { operation: operation.into(), message: message.to_string() }
    }

    pub fn invariant(operation: impl Into<String>, detail: impl ToString) -> Self {
        Self::InvariantViolation { operation: operation.into(), detail: detail.to_string() }
    }

    pub fn operation(&self) -> &str {
        match self {
            Self::Transient { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::InvariantViolation { operation, .. } => operation,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
