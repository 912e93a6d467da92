use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use ethc_api::prelude::*;
use ethc_client::retry_transient;

use crate::error::MiningError;
use crate::outcome::{FailureReason, SessionOutcome};
use crate::session::{AttemptRequest, MinerContext, MiningSession, SessionPolicy};

const MIN_LOOP_WAIT_SECONDS: u64 = 5;

/// Result of one wallet's attempt within a round.
pub type WalletResult = (String, Result<SessionOutcome, MiningError>);

/// Runs one session per wallet concurrently. Attempts from different wallets share nothing but
/// the read-only capabilities and the wallet locks.
pub async fn mine_round(
    ctx: &MinerContext,
    policy: &SessionPolicy,
    wallets: &[String],
    batch_size: Option<u64>,
    cancel: &CancellationToken,
) -> Vec<WalletResult> {
    let attempts = wallets.iter().map(|name| {
        let mut session = MiningSession::new(ctx.clone(), policy.clone());
        let request = AttemptRequest::new(name.clone()).with_batch_size(batch_size);
        async move { (name.clone(), session.attempt(request, cancel).await) }
    });

    join_all(attempts).await
}

/// Wait before the next tick: until the round is due, within `[MIN_LOOP_WAIT_SECONDS, interval]`.
pub fn next_wait(info: &BlockInfo) -> Duration {
    let max = info.round_interval.max(MIN_LOOP_WAIT_SECONDS);
    Duration::from_secs(info.until_next_round().clamp(MIN_LOOP_WAIT_SECONDS, max))
}

/// Which round each wallet last attempted, and whether that attempt may have placed entries.
#[derive(Debug, Default)]
pub struct RoundLedger {
    attempted: HashMap<String, u64>,
    spent: HashMap<String, u64>,
}

impl RoundLedger {
    /// A wallet mines a new round once. It tries the same round again only while the round is
    /// past its interval and its last attempt there placed nothing.
    pub fn should_attempt(&self, wallet: &str, info: &BlockInfo) -> bool {
        let round = Some(&info.current_round);
        if self.spent.get(wallet) == round {
            return false;
        }
        self.attempted.get(wallet) != round || info.is_round_open()
    }

    pub fn record(&mut self, wallet: &str, round: u64, result: &Result<SessionOutcome, MiningError>) {
        self.attempted.insert(wallet.to_string(), round);
        if matches!(result, Ok(outcome) if outcome.spent_round()) {
            self.spent.insert(wallet.to_string(), round);
        }
    }
}

/// Mines with every wallet once per round index until cancelled.
///
/// A round whose interval has already elapsed is attempted again on the next tick, because the
/// contract only opens the next round when someone mines. A wallet whose attempt may have
/// entered the round (resolved, or a transaction of unknown fate) is never sent again for that
/// round. Connectivity problems are logged and the loop keeps going; any other error stops it.
pub async fn mine_loop(
    ctx: MinerContext,
    policy: SessionPolicy,
    wallets: Vec<String>,
    batch_size: Option<u64>,
    cancel: CancellationToken,
) -> Result<(), MiningError> {
    let mut rounds = RoundLedger::default();
    info!("Mining with {} wallets", wallets.len());

    while !cancel.is_cancelled() {
        let wait = match retry_transient("snapshot", || ctx.tracker.snapshot()).await {
            Ok(info) => {
                let due: Vec<String> = wallets
                    .iter()
                    .filter(|wallet| rounds.should_attempt(wallet, &info))
                    .cloned()
                    .collect();
                if due.is_empty() {
                    debug!("Already mined round {}", info.current_round);
                }

                let results = mine_round(&ctx, &policy, &due, batch_size, &cancel).await;
                for (wallet, result) in results {
                    rounds.record(&wallet, info.current_round, &result);
                    match result {
                        Ok(SessionOutcome::Failed(FailureReason::ReconciliationFailed { tx_hash, error }))
                            if !error.is_retriable() =>
                        {
                            error!("{} could not reconcile {}, stopping: {}", wallet, tx_hash, error);
                            return Err(error);
                        }
                        Ok(outcome) => debug!("{} finished round {}: {}", wallet, info.current_round, outcome.label()),
                        Err(e) if e.is_retriable() => error!("{} attempt failed: {}", wallet, e),
                        Err(e) => {
                            error!("{} attempt failed, stopping: {}", wallet, e);
                            return Err(e);
                        }
                    }
                }
                next_wait(&info)
            }
            Err(e) if e.is_retriable() => {
                warn!("Round snapshot failed: {}", e);
                Duration::from_secs(MIN_LOOP_WAIT_SECONDS)
            }
            Err(e) => return Err(e),
        };

        debug!("Waiting {:?} for the next round", wait);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    info!("Mining loop stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::AbortReason;

    fn info(elapsed: u64) -> BlockInfo {
        BlockInfo { current_round: 3, last_round_at: 1_000, now: 1_000 + elapsed, round_interval: 60 }
    }

    fn open_round() -> BlockInfo {
        info(70)
    }

    #[test]
    fn test_round_ledger_never_repeats_a_spent_round() {
        let mut rounds = RoundLedger::default();
        assert!(rounds.should_attempt("w", &open_round()));

        let timeout = SessionOutcome::Failed(FailureReason::ConfirmationTimeout {
            tx_hash: Default::default(),
            attempts: 5,
        });
        rounds.record("w", 3, &Ok(timeout));
        assert!(!rounds.should_attempt("w", &open_round()));
        assert!(!rounds.should_attempt("w", &info(10)));
        assert!(rounds.should_attempt("other", &open_round()));

        let next = BlockInfo { current_round: 4, ..info(10) };
        assert!(rounds.should_attempt("w", &next));
    }

    #[test]
    fn test_round_ledger_retries_open_round_after_abstention() {
        let mut rounds = RoundLedger::default();
        rounds.record("w", 3, &Ok(SessionOutcome::Aborted(AbortReason::Cancelled)));
        assert!(rounds.should_attempt("w", &open_round()));
        assert!(!rounds.should_attempt("w", &info(10)));

        let rejected = SessionOutcome::Failed(FailureReason::BroadcastRejected { message: "underpriced".to_string() });
        rounds.record("w", 3, &Ok(rejected));
        assert!(rounds.should_attempt("w", &open_round()));
    }

    #[test]
    fn test_next_wait() {
        assert_eq!(next_wait(&info(10)), Duration::from_secs(50));
        assert_eq!(next_wait(&info(58)), Duration::from_secs(MIN_LOOP_WAIT_SECONDS));
        assert_eq!(next_wait(&info(300)), Duration::from_secs(MIN_LOOP_WAIT_SECONDS));
        assert_eq!(next_wait(&info(0)), Duration::from_secs(60));
    }
}
