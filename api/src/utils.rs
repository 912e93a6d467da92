use alloy::primitives::{utils::format_ether, U256};

use crate::error::{LedgerError, LedgerResult};

/// Helper: render a wei amount as ether with the unit suffix
pub fn format_eth(wei: U256) -> String {
    format!("{} ETH", format_ether(wei))
}

/// Helper: render a signed wei amount as ether
pub fn format_signed_eth(wei: i128) -> String {
    let magnitude = format_ether(U256::from(wei.unsigned_abs()));
    if wei < 0 {
        format!("-{} ETH", magnitude)
    } else {
        format!("{} ETH", magnitude)
    }
}

/// Helper: lossy conversion used only for probability-weighted values
pub fn wei_to_f64(wei: U256) -> f64 {
    match u128::try_from(wei) {
        Ok(v) => v as f64,
        Err(_) => f64::MAX,
    }
}

pub fn to_i128_saturating(wei: U256) -> i128 {
    u128::try_from(wei)
        .ok()
        .and_then(|v| i128::try_from(v).ok())
        .unwrap_or(i128::MAX)
}

/// Helper: narrow a contract integer, treating overflow as an invariant violation
pub fn to_u64(operation: &str, value: U256) -> LedgerResult<u64> {
    u64::try_from(value)
        .map_err(|_| LedgerError::invariant(operation, format!("{} does not fit in u64", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eth() {
        let wei = U256::from(100_000_000_000_000u64);
        assert_eq!(format_eth(wei), "0.000100000000000000 ETH");
        assert_eq!(format_signed_eth(-1_000_000_000_000_000_000), "-1.000000000000000000 ETH");
    }

    #[test]
    fn test_to_u64() {
        assert_eq!(to_u64("blockNumber", U256::from(42)).unwrap(), 42);
        let err = to_u64("blockNumber", U256::MAX).unwrap_err();
        assert_eq!(err.operation(), "blockNumber");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_saturating_conversions() {
        assert_eq!(to_i128_saturating(U256::MAX), i128::MAX);
        assert_eq!(to_i128_saturating(U256::from(5)), 5);
        assert_eq!(wei_to_f64(U256::from(1_000u64)), 1_000.0);
    }
}
