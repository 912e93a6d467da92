use std::sync::Arc;

use log::{debug, warn};

use ethc_api::prelude::*;
use ethc_client::{LedgerClient, MiningContract};

use crate::error::MiningError;

/// Derives round timing from the contract clock and the ledger clock. Nothing is cached:
/// every snapshot is three fresh reads.
#[derive(Clone)]
pub struct BlockTimingTracker {
    contract: Arc<dyn MiningContract>,
    ledger: Arc<dyn LedgerClient>,
    round_interval: u64,
}

impl BlockTimingTracker {
    pub fn new(contract: Arc<dyn MiningContract>, ledger: Arc<dyn LedgerClient>, round_interval: u64) -> Self {
        Self { contract, ledger, round_interval }
    }

    /// Reads the interval from the contract once and prefers it over `configured`. A contract
    /// that does not expose it keeps the configured value.
    pub async fn with_live_interval(
        contract: Arc<dyn MiningContract>,
        ledger: Arc<dyn LedgerClient>,
        configured: u64,
    ) -> Self {
        let round_interval = match contract.round_interval().await {
            Ok(live) if live > 0 => {
                if live != configured {
                    warn!(
                        "Configured round interval {}s does not match contract interval {}s, using {}s",
                        configured, live, live
                    );
                }
                live
            }
            Ok(_) => {
                warn!("Contract reports a zero round interval, using {}s", configured);
                configured
            }
            Err(e) => {
                debug!("Round interval not readable ({}), using {}s", e, configured);
                configured
            }
        };

        Self::new(contract, ledger, round_interval)
    }

    pub fn round_interval(&self) -> u64 {
        self.round_interval
    }

    /// Fails with `LedgerUnavailable` when a read fails. Retrying is the caller's decision.
    pub async fn snapshot(&self) -> Result<BlockInfo, MiningError> {
        let (current_round, last_round_at, now) = tokio::try_join!(
            self.contract.current_round(),
            self.contract.last_round_at(),
            self.ledger.now(),
        )?;

        let info = BlockInfo {
            current_round,
            last_round_at,
            now,
            round_interval: self.round_interval,
        };
        debug!(
            "Round {}: {}s elapsed of {}s",
            info.current_round,
            info.elapsed(),
            info.round_interval
        );
        Ok(info)
    }

    pub fn is_round_open(&self, info: &BlockInfo) -> bool {
        info.is_round_open()
    }

    pub async fn stats(&self) -> Result<MiningStats, MiningError> {
        let (info, mine_cost, mining_reward) = tokio::try_join!(
            self.snapshot(),
            async { self.contract.mine_cost().await.map_err(MiningError::from) },
            async { self.contract.mining_reward().await.map_err(MiningError::from) },
        )?;

        Ok(MiningStats { info, mine_cost, mining_reward })
    }
}
