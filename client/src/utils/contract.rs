use alloy::{
    primitives::{Address, U256},
    providers::DynProvider,
};
use async_trait::async_trait;
use log::debug;

use ethc_api::prelude::*;
use ethc_api::sdk::IEthcMiner::IEthcMinerInstance;
use crate::utils::rpc::read_error;

/// Typed access to the mining contract. Method names are semantic; how they map onto the
/// deployed ABI is the implementation's concern.
#[async_trait]
pub trait MiningContract: Send + Sync {
    fn address(&self) -> Address;

    async fn current_round(&self) -> LedgerResult<u64>;

    async fn last_round_at(&self) -> LedgerResult<u64>;

    /// Round interval as reported by the contract, where the deployment exposes it.
    async fn round_interval(&self) -> LedgerResult<u64>;

    async fn mine_cost(&self) -> LedgerResult<U256>;

    async fn mining_reward(&self) -> LedgerResult<U256>;

    async fn miners_of_round(&self, round: u64) -> LedgerResult<RoundMiners>;

    async fn halving_info(&self) -> LedgerResult<HalvingInfo>;

    fn mine_call(&self, signer: Address, batch_size: u64, value: U256) -> ContractCall {
        build_mine_call(self.address(), signer, batch_size, value)
    }
}

fn contract_error(operation: &str, err: alloy::contract::Error) -> LedgerError {
    match err {
        alloy::contract::Error::TransportError(e) => read_error(operation, e),
        other => LedgerError::invariant(operation, other),
    }
}

/// `eth_call` backed implementation over the `IEthcMiner` binding.
#[derive(Clone)]
pub struct RpcMiningContract {
    contract: IEthcMinerInstance<DynProvider>,
    cost_source: CostSource,
}

impl RpcMiningContract {
    pub fn new(address: Address, provider: DynProvider, cost_source: CostSource) -> Self {
        Self {
            contract: IEthcMiner::new(address, provider),
            cost_source,
        }
    }

    pub fn cost_source(&self) -> CostSource {
        self.cost_source
    }
}

#[async_trait]
impl MiningContract for RpcMiningContract {
    fn address(&self) -> Address {
        *self.contract.address()
    }

    async fn current_round(&self) -> LedgerResult<u64> {
        let value = self
            .contract
            .blockNumber()
            .call()
            .await
            .map_err(|e| contract_error("blockNumber", e))?;
        to_u64("blockNumber", value)
    }

    async fn last_round_at(&self) -> LedgerResult<u64> {
        let value = self
            .contract
            .lastBlockTime()
            .call()
            .await
            .map_err(|e| contract_error("lastBlockTime", e))?;
        to_u64("lastBlockTime", value)
    }

    async fn round_interval(&self) -> LedgerResult<u64> {
        let value = self
            .contract
            .blockInterval()
            .call()
            .await
            .map_err(|e| contract_error("blockInterval", e))?;
        to_u64("blockInterval", value)
    }

    async fn mine_cost(&self) -> LedgerResult<U256> {
        match self.cost_source {
            CostSource::Function => self
                .contract
                .mineCost()
                .call()
                .await
                .map_err(|e| contract_error("mineCost", e)),
            CostSource::Constant => self
                .contract
                .MINE_COST()
                .call()
                .await
                .map_err(|e| contract_error("MINE_COST", e)),
            CostSource::Fixed(cost) => Ok(cost),
        }
    }

    async fn mining_reward(&self) -> LedgerResult<U256> {
        self.contract
            .miningReward()
            .call()
            .await
            .map_err(|e| contract_error("miningReward", e))
    }

    async fn miners_of_round(&self, round: u64) -> LedgerResult<RoundMiners> {
        let index = U256::from(round);

        // The count is read first: entries only accumulate, so the list read after it can
        // never legitimately be shorter.
        let count = self
            .contract
            .minersOfBlockCount(index)
            .call()
            .await
            .map_err(|e| contract_error("minersOfBlockCount", e))?;
        let count = to_u64("minersOfBlockCount", count)?;

        let miners_call = self.contract.minersOfBlock(index);
        let selected_call = self.contract.selectedMinerOfBlock(index);
        let (miners, selected_miner) = tokio::try_join!(
            async { miners_call.call().await.map_err(|e| contract_error("minersOfBlock", e)) },
            async {
                selected_call
                    .call()
                    .await
                    .map_err(|e| contract_error("selectedMinerOfBlock", e))
            },
        )?;

        if (miners.len() as u64) < count {
            return Err(LedgerError::invariant(
                "minersOfBlock",
                format!("round {} lists {} miners but counts {}", round, miners.len(), count),
            ));
        }

        debug!("Round {}: {} miners, selected {}", round, miners.len(), selected_miner);

        Ok(RoundMiners {
            round,
            miner_count: miners.len() as u64,
            miners,
            selected_miner,
        })
    }

    async fn halving_info(&self) -> LedgerResult<HalvingInfo> {
        let last_call = self.contract.lastHalvingBlock();
        let next_call = self.contract.nextHalvingBlock();
        let interval_call = self.contract.halvingInterval();

        let (current_round, last, next, interval) = tokio::try_join!(
            self.current_round(),
            async { last_call.call().await.map_err(|e| contract_error("lastHalvingBlock", e)) },
            async { next_call.call().await.map_err(|e| contract_error("nextHalvingBlock", e)) },
            async { interval_call.call().await.map_err(|e| contract_error("halvingInterval", e)) },
        )?;

        Ok(HalvingInfo {
            current_round,
            last_halving_round: to_u64("lastHalvingBlock", last)?,
            next_halving_round: to_u64("nextHalvingBlock", next)?,
            halving_interval: to_u64("halvingInterval", interval)?,
        })
    }
}
