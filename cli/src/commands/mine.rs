use std::sync::Arc;

use anyhow::{anyhow, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use tokio_util::sync::CancellationToken;

use ethc_api::prelude::*;
use ethc_client::WalletStore;
use ethc_miner::{
    mine_loop, AttemptRequest, MinerContext, MiningSession, SessionOutcome,
};

use crate::cli::{Cli, Commands};
use crate::commands::Connection;
use crate::{config, log};

pub async fn handle_mine_commands(cli: Cli, conn: Connection) -> Result<()> {
    let wallets = Arc::new(config::load_wallets()?);
    if wallets.is_empty() {
        log::print_error("No WALLET_* entries configured");
        return Ok(());
    }

    let notifier = config::notifier_set();
    log::print_message(&format!("Notification channels: {}", notifier.len()));

    let tracker = conn.tracker().await;
    let ctx = MinerContext::new(
        conn.ledger.clone(),
        conn.contract.clone(),
        wallets.clone(),
        Arc::new(notifier),
        tracker.round_interval(),
    )
    .with_tracker(tracker);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Mine { wallet, batch, yes, policy } => {
            let info = wallets.resolve(&wallet)?;
            log::print_message(&format!("Using wallet: {} ({})", info.name, info.address));

            if !yes {
                let proceed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("→ Submit a paid mining transaction if the round is profitable?")
                    .default(false)
                    .interact()
                    .map_err(|e| anyhow!("Failed to get user input: {}", e))?;
                if !proceed {
                    log::print_error("Mining cancelled");
                    return Ok(());
                }
            }

            let mut session = MiningSession::new(ctx, policy.to_policy());
            let pb = log::spinner(&format!("Mining with {}...", info.name));
            let result = session
                .attempt(AttemptRequest::new(info.name.clone()).with_batch_size(batch), &cancel)
                .await;
            pb.finish_and_clear();

            print_outcome(&info.name, &result?);
        }

        Commands::Run { wallets: names, batch, policy } => {
            let names = if names.is_empty() { wallets.names() } else { names };
            for name in &names {
                wallets.resolve(name)?;
            }

            log::print_info("Starting mining loop, press Ctrl-C to stop...");
            log::print_count(&format!("Wallets: {}", names.join(", ")));
            mine_loop(ctx, policy.to_policy(), names, batch, cancel).await?;
        }

        _ => return Err(anyhow!("Not a mining command")),
    }

    Ok(())
}

/// Cancelling stops a session before it signs, or stops its wait for a receipt. A broadcast
/// transaction is left alone.
fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::print_error("Interrupted, nothing further will be signed...");
            cancel.cancel();
        }
    });
}

fn print_outcome(wallet: &str, outcome: &SessionOutcome) {
    log::print_section_header(&format!("{} {}", wallet, outcome.label()));

    match outcome {
        SessionOutcome::Resolved(resolved) => {
            log::print_message(&format!("Round: {}", resolved.round));
            log::print_message(&format!("Transaction: {}", resolved.tx_hash));
            log::print_message(&format!("Gas Used: {} at {} wei", resolved.gas_used, resolved.effective_gas_price));
            if resolved.settled {
                log::print_message(&format!("Selected Miner: {}", resolved.selected_miner));
            } else {
                log::print_warning("Round not settled yet, counted as a loss for now");
            }
            let net = format_signed_eth(resolved.net_result);
            if resolved.won {
                log::print_success(&format!("Won, net {}", net));
            } else {
                log::print_count(&format!("Net {}", net));
            }
        }
        SessionOutcome::Aborted(reason) => log::print_warning(&reason.to_string()),
        SessionOutcome::Failed(reason) => {
            log::print_error(&reason.to_string());
            if !reason.is_known_failure() {
                log::print_warning("Final state unknown, check the transaction before retrying");
            }
        }
    }
    log::print_divider();
}
