use alloy::primitives::U256;

use ethc_api::prelude::*;

/// Chance that one entry wins the round.
///
/// Every participant, including the entry about to be submitted, is assumed equally likely to
/// be selected. This models a uniform draw over participants; the contract does not promise it.
pub fn estimate_win_probability(miner_count: u64) -> f64 {
    if miner_count == 0 {
        return 1.0;
    }
    1.0 / (miner_count as f64 + 1.0)
}

/// Chance that at least one of `batch_size` entries wins, treating each entry as an
/// independent trial.
pub fn estimate_batch_win_probability(probability: f64, batch_size: u64) -> f64 {
    let p = probability.clamp(0.0, 1.0);
    let miss = (1.0 - p).powf(batch_size as f64);
    (1.0 - miss).clamp(0.0, 1.0)
}

pub fn expected_value(reward: f64, probability: f64, total_cost: f64) -> f64 {
    reward * probability - total_cost
}

/// `clamp(miner_count / divisor, min, max)`, or a single entry when nobody else is mining.
pub fn choose_batch_size(miner_count: u64, min: u64, max: u64, divisor: u64) -> u64 {
    if miner_count == 0 {
        return 1;
    }
    let min = min.max(1);
    let max = max.max(min);
    miner_count.checked_div(divisor).unwrap_or(min).clamp(min, max)
}

/// Priced view of one candidate attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub miner_count: u64,
    pub batch_size: u64,
    pub probability: f64,
    pub batch_probability: f64,
    pub reward: U256,
    pub unit_cost: U256,
    pub total_cost: U256,
    pub expected_value: f64,
}

impl Estimate {
    pub fn is_profitable(&self) -> bool {
        self.expected_value > 0.0
    }
}

/// Batch-size policy plus the probability model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitabilityEstimator {
    pub min_batch_size: u64,
    pub max_batch_size: u64,
    pub batch_miner_divisor: u64,
}

impl Default for ProfitabilityEstimator {
    fn default() -> Self {
        Self {
            min_batch_size: MIN_BATCH_SIZE,
            max_batch_size: MAX_BATCH_SIZE,
            batch_miner_divisor: BATCH_MINER_DIVISOR,
        }
    }
}

impl ProfitabilityEstimator {
    pub fn batch_size_for(&self, miner_count: u64) -> u64 {
        choose_batch_size(
            miner_count,
            self.min_batch_size,
            self.max_batch_size,
            self.batch_miner_divisor,
        )
    }

    /// Reward and cost are compared as raw wei amounts, exactly as the contract reports them.
    pub fn estimate(
        &self,
        miner_count: u64,
        reward: U256,
        unit_cost: U256,
        requested_batch: Option<u64>,
    ) -> Estimate {
        let batch_size = requested_batch
            .unwrap_or_else(|| self.batch_size_for(miner_count))
            .max(1);
        let probability = estimate_win_probability(miner_count);
        let batch_probability = estimate_batch_win_probability(probability, batch_size);
        let total_cost = unit_cost.saturating_mul(U256::from(batch_size));

        Estimate {
            miner_count,
            batch_size,
            probability,
            batch_probability,
            reward,
            unit_cost,
            total_cost,
            expected_value: expected_value(wei_to_f64(reward), batch_probability, wei_to_f64(total_cost)),
        }
    }
}
