use std::fmt;

use alloy::primitives::{TxHash, U256};

use ethc_api::prelude::*;

use crate::error::MiningError;

/// Why a session stopped before committing funds.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    NotProfitable {
        expected_value: f64,
        batch_probability: f64,
        batch_size: u64,
    },
    InsufficientFunds {
        required: U256,
        available: U256,
    },
    /// Gas estimation was refused by the node, so the call would fail on chain.
    CallWouldRevert { message: String },
    /// Stopped on request before anything was signed.
    Cancelled,
}

impl AbortReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotProfitable { .. } => "NotProfitable",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::CallWouldRevert { .. } => "CallWouldRevert",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotProfitable { expected_value, batch_probability, batch_size } => write!(
                f,
                "not profitable: expected value {:.2} wei for {} entries at {:.2}% win chance",
                expected_value,
                batch_size,
                batch_probability * 100.0
            ),
            Self::InsufficientFunds { required, available } => write!(
                f,
                "insufficient funds: need {}, have {}",
                format_eth(*required),
                format_eth(*available)
            ),
            Self::CallWouldRevert { message } => write!(f, "mine call would revert: {}", message),
            Self::Cancelled => write!(f, "cancelled before signing"),
        }
    }
}

/// Why a session that broadcast (or tried to) did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    BroadcastRejected { message: String },
    TransactionReverted { tx_hash: TxHash, gas_used: u64 },
    /// The transaction may still confirm later.
    ConfirmationTimeout { tx_hash: TxHash, attempts: u32 },
    /// Polling stopped on request. The transaction is unaffected.
    ConfirmationCancelled { tx_hash: TxHash },
    /// The receipt or the round result could not be read back.
    ReconciliationFailed { tx_hash: TxHash, error: MiningError },
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BroadcastRejected { .. } => "BroadcastRejected",
            Self::TransactionReverted { .. } => "TransactionReverted",
            Self::ConfirmationTimeout { .. } => "ConfirmationTimeout",
            Self::ConfirmationCancelled { .. } => "ConfirmationCancelled",
            Self::ReconciliationFailed { .. } => "ReconciliationFailed",
        }
    }

    /// False when the transaction may have entered the round and its result is unknown.
    pub fn is_known_failure(&self) -> bool {
        matches!(self, Self::BroadcastRejected { .. } | Self::TransactionReverted { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::BroadcastRejected { .. } => None,
            Self::TransactionReverted { tx_hash, .. }
            | Self::ConfirmationTimeout { tx_hash, .. }
            | Self::ConfirmationCancelled { tx_hash }
            | Self::ReconciliationFailed { tx_hash, .. } => Some(*tx_hash),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BroadcastRejected { message } => write!(f, "broadcast rejected: {}", message),
            Self::TransactionReverted { tx_hash, gas_used } => {
                write!(f, "transaction {} reverted after using {} gas", tx_hash, gas_used)
            }
            Self::ConfirmationTimeout { tx_hash, attempts } => write!(
                f,
                "no receipt for {} after {} polls, it may still confirm",
                tx_hash, attempts
            ),
            Self::ConfirmationCancelled { tx_hash } => {
                write!(f, "stopped waiting for {}, it may still confirm", tx_hash)
            }
            Self::ReconciliationFailed { tx_hash, error } => {
                write!(f, "could not read back the result of {}: {}", tx_hash, error)
            }
        }
    }
}

/// Terminal result of one session attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Resolved(AttemptOutcome),
    Aborted(AbortReason),
    Failed(FailureReason),
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolved(outcome) if outcome.won => "Won",
            Self::Resolved(_) => "Lost",
            Self::Aborted(reason) => reason.label(),
            Self::Failed(reason) => reason.label(),
        }
    }

    pub fn is_abstention(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// True when entries may have been placed, so the round must not be mined again.
    pub fn spent_round(&self) -> bool {
        match self {
            Self::Resolved(_) => true,
            Self::Aborted(_) => false,
            Self::Failed(reason) => !reason.is_known_failure(),
        }
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Resolved(outcome) => Some(outcome.tx_hash),
            Self::Aborted(_) => None,
            Self::Failed(reason) => reason.tx_hash(),
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(outcome) => {
                let result = match (outcome.won, outcome.settled) {
                    (true, _) => "won",
                    (false, true) => "lost",
                    (false, false) => "not settled yet (counted as lost)",
                };
                write!(
                    f,
                    "round {} {}, net {} (tx {})",
                    outcome.round,
                    result,
                    format_signed_eth(outcome.net_result),
                    outcome.tx_hash
                )
            }
            Self::Aborted(reason) => write!(f, "aborted, {}", reason),
            Self::Failed(reason) => write!(f, "failed, {}", reason),
        }
    }
}
