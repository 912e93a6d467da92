use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::TransportError,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;

use ethc_api::prelude::*;
use crate::mine::call_request;

/// Ledger node capability used by the miner. Every call is a single remote round trip; none of
/// them retry on their own.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> LedgerResult<u64>;

    /// Timestamp of the latest block.
    async fn now(&self) -> LedgerResult<u64>;

    async fn balance_of(&self, address: Address) -> LedgerResult<U256>;

    /// Next nonce for `address`, counting transactions still in the mempool.
    async fn nonce_of(&self, address: Address) -> LedgerResult<u64>;

    /// Base fee and suggested tip, or `None` on a network without a fee market.
    async fn fee_market(&self) -> LedgerResult<Option<FeeMarket>>;

    async fn gas_price(&self) -> LedgerResult<u128>;

    async fn estimate_gas(&self, call: &ContractCall) -> LedgerResult<u64>;

    async fn broadcast(&self, signed: Bytes) -> LedgerResult<TxHash>;

    /// `Ok(None)` while the transaction is pending.
    async fn receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<Receipt>>;
}

/// Classifies a failed read. Reverts mean the node and the miner disagree about the contract;
/// everything else is treated as a connectivity problem.
pub(crate) fn read_error(operation: &str, err: TransportError) -> LedgerError {
    if let Some(payload) = err.as_error_resp() {
        if payload.message.contains("revert") {
            return LedgerError::invariant(operation, &payload.message);
        }
    }
    LedgerError::transient(operation, err)
}

/// Classifies a failed write or call simulation. Any error answer from the node is a rejection.
pub(crate) fn write_error(operation: &str, err: TransportError) -> LedgerError {
    if let Some(payload) = err.as_error_resp() {
        return LedgerError::rejected(operation, &payload.message);
    }
    LedgerError::transient(operation, err)
}

/// JSON-RPC backed ledger client.
#[derive(Clone)]
pub struct RpcLedger {
    provider: DynProvider,
    url: String,
}

impl RpcLedger {
    pub fn connect(url: &str) -> Result<Self> {
        let parsed = url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC url '{}': {}", url, e))?;
        let provider = ProviderBuilder::new().connect_http(parsed).erased();
        Ok(Self { provider, url: url.to_string() })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn chain_id(&self) -> LedgerResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| read_error("eth_chainId", e))
    }

    async fn now(&self) -> LedgerResult<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| read_error("eth_getBlockByNumber", e))?
            .ok_or_else(|| LedgerError::invariant("eth_getBlockByNumber", "latest block missing"))?;
        Ok(block.header.timestamp)
    }

    async fn balance_of(&self, address: Address) -> LedgerResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| read_error("eth_getBalance", e))
    }

    async fn nonce_of(&self, address: Address) -> LedgerResult<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| read_error("eth_getTransactionCount", e))
    }

    async fn fee_market(&self) -> LedgerResult<Option<FeeMarket>> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| read_error("eth_getBlockByNumber", e))?
            .ok_or_else(|| LedgerError::invariant("eth_getBlockByNumber", "latest block missing"))?;

        let Some(base_fee) = block.header.base_fee_per_gas else {
            debug!("Latest block carries no base fee, using legacy pricing");
            return Ok(None);
        };

        let priority_fee = self
            .provider
            .get_max_priority_fee_per_gas()
            .await
            .map_err(|e| read_error("eth_maxPriorityFeePerGas", e))?;

        Ok(Some(FeeMarket { base_fee: base_fee as u128, priority_fee }))
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| read_error("eth_gasPrice", e))
    }

    async fn estimate_gas(&self, call: &ContractCall) -> LedgerResult<u64> {
        self.provider
            .estimate_gas(call_request(call))
            .await
            .map_err(|e| write_error("eth_estimateGas", e))
    }

    async fn broadcast(&self, signed: Bytes) -> LedgerResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&signed)
            .await
            .map_err(|e| write_error("eth_sendRawTransaction", e))?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| read_error("eth_getTransactionReceipt", e))?;

        Ok(receipt.map(|r| Receipt {
            tx_hash: r.transaction_hash,
            success: r.status(),
            gas_used: r.gas_used,
            effective_gas_price: r.effective_gas_price,
            block_number: r.block_number,
        }))
    }
}
