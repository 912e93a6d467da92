use alloy::primitives::{Address, Bytes, TxHash, U256};

use crate::utils::to_i128_saturating;

/// Snapshot of round timing, read fresh on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Round counter kept by the contract (not a ledger block height).
    pub current_round: u64,
    /// Ledger time of the last round transition.
    pub last_round_at: u64,
    /// Ledger time of the latest block.
    pub now: u64,
    pub round_interval: u64,
}

impl BlockInfo {
    pub fn elapsed(&self) -> u64 {
        self.now.saturating_sub(self.last_round_at)
    }

    pub fn is_round_open(&self) -> bool {
        self.elapsed() >= self.round_interval
    }

    /// Number of whole intervals that passed since the last transition.
    pub fn rounds_ready(&self) -> u64 {
        if self.round_interval == 0 {
            return 0;
        }
        self.elapsed() / self.round_interval
    }

    /// Seconds until the next round opens, zero when one is already open.
    pub fn until_next_round(&self) -> u64 {
        self.round_interval.saturating_sub(self.elapsed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningStats {
    pub info: BlockInfo,
    pub mine_cost: U256,
    pub mining_reward: U256,
}

/// Participants of one round as recorded by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundMiners {
    pub round: u64,
    pub miners: Vec<Address>,
    pub miner_count: u64,
    /// Zero address while the round is unresolved.
    pub selected_miner: Address,
}

impl RoundMiners {
    pub fn is_settled(&self) -> bool {
        self.selected_miner != Address::ZERO
    }

    /// Addresses compare by value, so checksum casing never matters here.
    pub fn is_winner(&self, address: Address) -> bool {
        self.is_settled() && self.selected_miner == address
    }

    pub fn entries_of(&self, address: Address) -> usize {
        self.miners.iter().filter(|m| **m == address).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalvingInfo {
    pub current_round: u64,
    pub last_halving_round: u64,
    pub next_halving_round: u64,
    pub halving_interval: u64,
}

impl HalvingInfo {
    pub fn rounds_until_halving(&self) -> u64 {
        self.next_halving_round.saturating_sub(self.current_round)
    }
}

/// Where the per-entry price of a mine is read from. Deployed variants of the contract expose
/// it under different names, and one of them does not expose it at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostSource {
    /// `mineCost()`
    #[default]
    Function,
    /// `MINE_COST()`
    Constant,
    /// Not read from the contract.
    Fixed(U256),
}

/// Current fee-market data of an EIP-1559 network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeMarket {
    pub base_fee: u128,
    pub priority_fee: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParameters {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl FeeParameters {
    /// Highest price per unit of gas this transaction can be charged.
    pub fn max_price_per_gas(&self) -> u128 {
        match self {
            Self::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
            Self::Legacy { gas_price } => *gas_price,
        }
    }
}

/// Shape of a contract call, used both for gas estimation and for the final transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

/// Every field a wallet needs to sign a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub call: ContractCall,
    pub gas_limit: u64,
    pub fees: FeeParameters,
}

/// A priced, funded plan for one mining transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningAttempt {
    pub wallet_name: String,
    pub wallet_address: Address,
    /// Round open when the attempt was built.
    pub round: u64,
    pub batch_size: u64,
    pub unit_cost: U256,
    pub total_value: U256,
    pub gas_limit: u64,
    pub fees: FeeParameters,
    /// Assigned under the wallet lock, right before signing.
    pub nonce: Option<u64>,
}

impl MiningAttempt {
    pub fn max_gas_cost(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.fees.max_price_per_gas())
    }

    pub fn required_balance(&self) -> U256 {
        self.total_value.saturating_add(self.max_gas_cost())
    }

    pub fn is_funded(&self, balance: U256) -> bool {
        self.required_balance() <= balance
    }
}

/// Ledger confirmation of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub block_number: Option<u64>,
}

impl Receipt {
    pub fn gas_cost(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.effective_gas_price)
    }
}

/// Terminal record of a confirmed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub tx_hash: TxHash,
    pub round: u64,
    pub confirmed: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub selected_miner: Address,
    pub won: bool,
    /// False when the round had no recorded winner yet at reconciliation time.
    pub settled: bool,
    /// Wei. Reward minus value minus gas when won, otherwise minus value and gas.
    pub net_result: i128,
}

impl AttemptOutcome {
    pub fn reconcile(
        attempt: &MiningAttempt,
        receipt: &Receipt,
        miners: &RoundMiners,
        reward: U256,
    ) -> Self {
        let won = miners.is_winner(attempt.wallet_address);
        let spent = to_i128_saturating(attempt.total_value.saturating_add(receipt.gas_cost()));
        let net_result = if won {
            to_i128_saturating(reward).saturating_sub(spent)
        } else {
            -spent
        };

        Self {
            tx_hash: receipt.tx_hash,
            round: attempt.round,
            confirmed: receipt.success,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            selected_miner: miners.selected_miner,
            won,
            settled: miners.is_settled(),
            net_result,
        }
    }
}
