pub mod info;
pub mod mine;
pub mod notify;

use std::sync::Arc;

use anyhow::Result;

use ethc_api::prelude::*;
use ethc_client::{RpcLedger, RpcMiningContract};
use ethc_miner::BlockTimingTracker;

use crate::cli::Cli;
use crate::{config, log};

/// Remote capabilities shared by every ledger-facing command.
pub struct Connection {
    pub ledger: Arc<RpcLedger>,
    pub contract: Arc<RpcMiningContract>,
}

impl Connection {
    pub fn open(cli: &Cli) -> Result<Self> {
        let rpc_url = config::rpc_url(cli.endpoint.as_ref())?;
        let address = config::contract_address(cli.contract.as_deref())?;

        let ledger = RpcLedger::connect(&rpc_url)?;
        let contract = RpcMiningContract::new(address, ledger.provider().clone(), cli.cost_source.0);

        log::print_message(&format!("Connected to: {}", config::redact_url(&rpc_url)));
        log::print_message(&format!("Mining contract: {}", address));

        Ok(Self {
            ledger: Arc::new(ledger),
            contract: Arc::new(contract),
        })
    }

    /// Timing tracker that prefers the contract's own round interval.
    pub async fn tracker(&self) -> BlockTimingTracker {
        BlockTimingTracker::with_live_interval(
            self.contract.clone(),
            self.ledger.clone(),
            ROUND_INTERVAL_SECONDS,
        )
        .await
    }
}
