use std::collections::BTreeMap;

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use chrono::DateTime;
use tokio::time::{sleep, Duration};

use ethc_api::prelude::*;
use ethc_client::{retry_transient, LedgerClient, MiningContract, WalletStore};
use ethc_miner::MiningError;

use crate::cli::{Cli, Commands};
use crate::commands::Connection;
use crate::{config, log};

pub async fn handle_info_commands(cli: Cli, conn: Connection) -> Result<()> {
    match cli.command {
        Commands::Stats {} => {
            let tracker = conn.tracker().await;
            let stats = retry_transient("stats", || tracker.stats()).await?;
            print_timing(&stats.info);

            log::print_section_header("Economics");
            log::print_message(&format!("Mine Cost: {}", format_eth(stats.mine_cost)));
            log::print_message(&format!("Mining Reward: {} ({} wei)", format_eth(stats.mining_reward), stats.mining_reward));
            if let Some(token) = config::token_address()? {
                log::print_message(&format!("Reward Token: {}", token));
            }
            log::print_divider();
        }

        Commands::Round { round } => {
            let round = match round {
                Some(round) => round,
                None => retry_transient("blockNumber", || conn.contract.current_round()).await?,
            };
            let miners = retry_transient("minersOfBlock", || conn.contract.miners_of_round(round)).await?;

            log::print_section_header(&format!("Round {}", round));
            log::print_count(&format!("Miners: {}", miners.miner_count));
            if miners.is_settled() {
                log::print_message(&format!("Selected Miner: {}", miners.selected_miner));
            } else {
                log::print_message("Selected Miner: not settled");
            }

            let mut entries: BTreeMap<Address, usize> = BTreeMap::new();
            for miner in &miners.miners {
                *entries.entry(*miner).or_default() += 1;
            }
            for (address, count) in entries {
                log::print_info(&format!("  {} x{}", address, count));
            }
            log::print_divider();
        }

        Commands::Halving {} => {
            let halving = retry_transient("halvingInfo", || conn.contract.halving_info()).await?;

            log::print_section_header("Halving");
            log::print_message(&format!("Current Round: {}", halving.current_round));
            log::print_message(&format!("Last Halving: {}", halving.last_halving_round));
            log::print_message(&format!("Next Halving: {}", halving.next_halving_round));
            log::print_message(&format!("Interval: {} rounds", halving.halving_interval));
            log::print_count(&format!("Rounds Until Halving: {}", halving.rounds_until_halving()));
            log::print_divider();
        }

        Commands::Estimate { batch, policy } => {
            let tracker = conn.tracker().await;
            let stats = retry_transient("stats", || tracker.stats()).await?;
            let miners = retry_transient("minersOfBlock", || async {
                conn.contract
                    .miners_of_round(stats.info.current_round)
                    .await
                    .map_err(MiningError::from)
            })
            .await?;

            let estimate = policy.to_policy().estimator().estimate(
                miners.miner_count,
                stats.mining_reward,
                stats.mine_cost,
                batch,
            );

            log::print_section_header(&format!("Round {} Estimate", stats.info.current_round));
            log::print_count(&format!("Miners: {}", estimate.miner_count));
            log::print_message(&format!("Batch Size: {}", estimate.batch_size));
            log::print_message(&format!("Win Chance Per Entry: {:.4}%", estimate.probability * 100.0));
            log::print_message(&format!("Win Chance For Batch: {:.4}%", estimate.batch_probability * 100.0));
            log::print_message(&format!("Total Cost: {}", format_eth(estimate.total_cost)));
            log::print_message(&format!("Expected Value: {:.0} wei", estimate.expected_value));
            if estimate.is_profitable() {
                log::print_success("Profitable, a session would proceed");
            } else {
                log::print_warning("Not profitable, a session would abstain");
            }
            log::print_divider();
        }

        Commands::Wallets {} => {
            let wallets = config::load_wallets()?;
            if wallets.is_empty() {
                log::print_error("No WALLET_* entries configured");
                return Ok(());
            }

            log::print_section_header("Wallets");
            for name in wallets.names() {
                let info = wallets.resolve(&name)?;
                let balance = retry_transient("eth_getBalance", || conn.ledger.balance_of(info.address)).await?;
                log::print_message(&format!("{}: {} ({})", info.name, info.address, format_eth(balance)));
            }
            log::print_divider();
        }

        Commands::Watch { count, interval } => {
            let tracker = conn.tracker().await;
            for i in 0..count {
                let info = retry_transient("snapshot", || tracker.snapshot()).await?;
                let status = if info.is_round_open() {
                    "open".to_string()
                } else {
                    format!("next in {}s", info.until_next_round())
                };
                log::print_info(&format!(
                    "Round {} | {}s elapsed of {}s | {}",
                    info.current_round,
                    info.elapsed(),
                    info.round_interval,
                    status
                ));

                if i + 1 < count {
                    sleep(Duration::from_secs(interval)).await;
                }
            }
        }

        _ => return Err(anyhow!("Not a read command")),
    }

    Ok(())
}

fn format_time(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn print_timing(info: &BlockInfo) {
    log::print_section_header("Round");
    log::print_message(&format!("Current Round: {}", info.current_round));
    log::print_message(&format!("Last Round At: {}", format_time(info.last_round_at)));
    log::print_message(&format!("Ledger Time: {}", format_time(info.now)));
    log::print_message(&format!("Interval: {}s", info.round_interval));
    log::print_message(&format!("Elapsed: {}s", info.elapsed()));
    if info.is_round_open() {
        log::print_count(&format!("Round open, {} interval(s) ready", info.rounds_ready()));
    } else {
        log::print_count(&format!("Next round in {}s", info.until_next_round()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_time(u64::MAX), u64::MAX.to_string());
    }
}
