use alloy::{network::TransactionBuilder, rpc::types::TransactionRequest};

use ethc_api::prelude::*;

/// Request shape for `eth_estimateGas`.
pub fn call_request(call: &ContractCall) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(call.from)
        .with_to(call.to)
        .with_value(call.value)
        .with_input(call.input.clone())
}

/// Fully specified request, ready to be signed.
pub fn transaction_request(tx: &UnsignedTransaction) -> TransactionRequest {
    let request = call_request(&tx.call)
        .with_chain_id(tx.chain_id)
        .with_nonce(tx.nonce)
        .with_gas_limit(tx.gas_limit);

    match tx.fees {
        FeeParameters::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => request
            .with_max_fee_per_gas(max_fee_per_gas)
            .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
        FeeParameters::Legacy { gas_price } => request.with_gas_price(gas_price),
    }
}

/// Pads a gas estimate by `multiplier_pct` percent, rounding up.
pub fn pad_gas_limit(estimate: u64, multiplier_pct: u64) -> u64 {
    let padded = (estimate as u128 * multiplier_pct as u128).div_ceil(100);
    padded.min(u64::MAX as u128) as u64
}

/// Fee parameters from the current market: `base_fee * multiplier + tip` as the ceiling, or the
/// flat gas price when the network has no fee market.
pub fn compute_fees(market: Option<FeeMarket>, base_fee_multiplier: u128, gas_price: u128) -> FeeParameters {
    match market {
        Some(FeeMarket { base_fee, priority_fee }) => FeeParameters::Eip1559 {
            max_fee_per_gas: base_fee
                .saturating_mul(base_fee_multiplier)
                .saturating_add(priority_fee),
            max_priority_fee_per_gas: priority_fee,
        },
        None => FeeParameters::Legacy { gas_price },
    }
}

/// Binds a funded attempt to a chain and a nonce.
pub fn build_mine_transaction(
    attempt: &MiningAttempt,
    call: ContractCall,
    chain_id: u64,
    nonce: u64,
) -> UnsignedTransaction {
    UnsignedTransaction {
        chain_id,
        nonce,
        call,
        gas_limit: attempt.gas_limit,
        fees: attempt.fees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};

    #[test]
    fn test_pad_gas_limit() {
        assert_eq!(pad_gas_limit(100_000, 120), 120_000);
        assert_eq!(pad_gas_limit(21_001, 120), 25_202);
        assert_eq!(pad_gas_limit(u64::MAX, 120), u64::MAX);
    }

    #[test]
    fn test_compute_fees() {
        let market = FeeMarket { base_fee: 10, priority_fee: 3 };
        assert_eq!(
            compute_fees(Some(market), 2, 99),
            FeeParameters::Eip1559 { max_fee_per_gas: 23, max_priority_fee_per_gas: 3 },
        );
        assert_eq!(compute_fees(None, 2, 99), FeeParameters::Legacy { gas_price: 99 });
    }

    #[test]
    fn test_transaction_request_carries_fees() {
        let call = build_mine_call(
            address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            3,
            U256::from(30),
        );
        let tx = UnsignedTransaction {
            chain_id: 1,
            nonce: 4,
            call,
            gas_limit: 90_000,
            fees: FeeParameters::Eip1559 { max_fee_per_gas: 50, max_priority_fee_per_gas: 2 },
        };

        let request = transaction_request(&tx);
        assert_eq!(request.nonce, Some(4));
        assert_eq!(request.gas, Some(90_000));
        assert_eq!(request.max_fee_per_gas, Some(50));
        assert_eq!(request.max_priority_fee_per_gas, Some(2));
        assert_eq!(request.value, Some(U256::from(30)));
        assert_eq!(request.gas_price, None);
    }
}
