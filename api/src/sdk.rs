use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::types::ContractCall;

sol! {
    /// Mining contract surface used by the miner. Read names follow the deployed proxy; the
    /// two cost getters exist on different deployments.
    #[sol(rpc)]
    interface IEthcMiner {
        function blockNumber() external view returns (uint256);
        function lastBlockTime() external view returns (uint256);
        function blockInterval() external view returns (uint256);

        function mineCost() external view returns (uint256);
        function MINE_COST() external view returns (uint256);
        function miningReward() external view returns (uint256);

        function minersOfBlock(uint256 blockNumber) external view returns (address[] memory);
        function minersOfBlockCount(uint256 blockNumber) external view returns (uint256);
        function selectedMinerOfBlock(uint256 blockNumber) external view returns (address);

        function lastHalvingBlock() external view returns (uint256);
        function nextHalvingBlock() external view returns (uint256);
        function halvingInterval() external view returns (uint256);

        function mine() external payable;
        function mineBatch(uint256 mineCount) external payable;
    }
}

/// Builds the payable mine call. A single entry uses `mine()`, anything larger `mineBatch(n)`.
pub fn build_mine_call(
    contract: Address,
    signer: Address,
    batch_size: u64,
    value: U256,
) -> ContractCall {
    let input = if batch_size <= 1 {
        IEthcMiner::mineCall {}.abi_encode()
    } else {
        IEthcMiner::mineBatchCall { mineCount: U256::from(batch_size) }.abi_encode()
    };

    ContractCall {
        from: signer,
        to: contract,
        value,
        input: input.into(),
    }
}
