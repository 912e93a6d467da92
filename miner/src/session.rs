use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use ethc_api::prelude::*;
use ethc_client::{
    build_mine_transaction, compute_fees, pad_gas_limit, LedgerClient, MiningContract, Notification,
    Notifier, WalletInfo, WalletStore,
};

use crate::error::MiningError;
use crate::lock::WalletLocks;
use crate::outcome::{AbortReason, FailureReason, SessionOutcome};
use crate::profit::{Estimate, ProfitabilityEstimator};
use crate::timing::BlockTimingTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Evaluating,
    Estimating,
    Building,
    Signing,
    Broadcasting,
    Confirming,
    Resolved { won: bool },
    Failed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved { .. } | Self::Failed | Self::Aborted)
    }
}

/// Tunable knobs of a session. Defaults come from the `ethc-api` constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub min_batch_size: u64,
    pub max_batch_size: u64,
    pub batch_miner_divisor: u64,
    pub gas_limit_multiplier_pct: u64,
    pub base_fee_multiplier: u128,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub settle_interval: Duration,
    pub settle_attempts: u32,
    pub notify_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            min_batch_size: MIN_BATCH_SIZE,
            max_batch_size: MAX_BATCH_SIZE,
            batch_miner_divisor: BATCH_MINER_DIVISOR,
            gas_limit_multiplier_pct: GAS_LIMIT_MULTIPLIER_PCT,
            base_fee_multiplier: BASE_FEE_MULTIPLIER,
            poll_interval: Duration::from_secs(RECEIPT_POLL_INTERVAL_SECONDS),
            poll_attempts: RECEIPT_POLL_ATTEMPTS,
            settle_interval: Duration::from_secs(SETTLE_POLL_INTERVAL_SECONDS),
            settle_attempts: SETTLE_POLL_ATTEMPTS,
            notify_timeout: Duration::from_secs(NOTIFY_TIMEOUT_SECONDS),
        }
    }
}

impl SessionPolicy {
    pub fn estimator(&self) -> ProfitabilityEstimator {
        ProfitabilityEstimator {
            min_batch_size: self.min_batch_size,
            max_batch_size: self.max_batch_size,
            batch_miner_divisor: self.batch_miner_divisor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRequest {
    pub wallet_name: String,
    /// Derived from the round's miner count when absent.
    pub batch_size: Option<u64>,
}

impl AttemptRequest {
    pub fn new(wallet_name: impl Into<String>) -> Self {
        Self { wallet_name: wallet_name.into(), batch_size: None }
    }

    pub fn with_batch_size(mut self, batch_size: Option<u64>) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Capabilities shared by every session of a process. Only the wallet locks are mutable.
#[derive(Clone)]
pub struct MinerContext {
    pub ledger: Arc<dyn LedgerClient>,
    pub contract: Arc<dyn MiningContract>,
    pub wallets: Arc<dyn WalletStore>,
    pub notifier: Arc<dyn Notifier>,
    pub locks: WalletLocks,
    pub tracker: BlockTimingTracker,
}

impl MinerContext {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        contract: Arc<dyn MiningContract>,
        wallets: Arc<dyn WalletStore>,
        notifier: Arc<dyn Notifier>,
        round_interval: u64,
    ) -> Self {
        let tracker = BlockTimingTracker::new(contract.clone(), ledger.clone(), round_interval);
        Self {
            ledger,
            contract,
            wallets,
            notifier,
            locks: WalletLocks::new(),
            tracker,
        }
    }

    pub fn with_tracker(mut self, tracker: BlockTimingTracker) -> Self {
        self.tracker = tracker;
        self
    }
}

/// Either keep going with a value or stop with a terminal outcome.
enum Step<T> {
    Proceed(T),
    Stop(SessionOutcome),
}

macro_rules! proceed {
    ($step:expr) => {
        match $step {
            Step::Proceed(value) => value,
            Step::Stop(outcome) => return Ok(outcome),
        }
    };
}

/// Drives one wallet through evaluate, build, sign, broadcast, confirm and reconcile.
///
/// Abstentions and failed transactions come back as a [`SessionOutcome`]; only conditions the
/// operator must look at (lost connectivity, unknown wallet, inconsistent contract data,
/// signing failures) are returned as [`MiningError`], after the session has moved to `Failed`.
/// Nothing is retried here, and at most one transaction is broadcast per attempt.
pub struct MiningSession {
    ctx: MinerContext,
    policy: SessionPolicy,
    state: SessionState,
    history: Vec<SessionState>,
}

impl MiningSession {
    pub fn new(ctx: MinerContext, policy: SessionPolicy) -> Self {
        Self {
            ctx,
            policy,
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state visited by the last attempt, starting at `Idle`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub async fn attempt(
        &mut self,
        request: AttemptRequest,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, MiningError> {
        self.state = SessionState::Idle;
        self.history = vec![SessionState::Idle];

        match self.run(&request, cancel).await {
            Ok(outcome) => {
                if let Some(notification) = self.finish(&request.wallet_name, &outcome) {
                    self.notify(notification).await;
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Some(notification) = self.fail(&request.wallet_name, &e) {
                    self.notify(notification).await;
                }
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    async fn run(
        &mut self,
        request: &AttemptRequest,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, MiningError> {
        self.transition(SessionState::Evaluating);
        let wallet = self.ctx.wallets.resolve(&request.wallet_name)?;
        let (round, miners, estimate) = self.evaluate(request).await?;

        self.transition(SessionState::Estimating);
        if !estimate.is_profitable() {
            return Ok(SessionOutcome::Aborted(AbortReason::NotProfitable {
                expected_value: estimate.expected_value,
                batch_probability: estimate.batch_probability,
                batch_size: estimate.batch_size,
            }));
        }
        debug!(
            "Round {} has {} miners, {} entries win with {:.2}%, expected value {:.2}",
            round,
            miners.miner_count,
            estimate.batch_size,
            estimate.batch_probability * 100.0,
            estimate.expected_value
        );

        self.transition(SessionState::Building);
        let (mut attempt, call) = proceed!(self.build(&wallet, &estimate).await?);
        if cancel.is_cancelled() {
            return Ok(SessionOutcome::Aborted(AbortReason::Cancelled));
        }

        let tx_hash = {
            let _guard = self.ctx.locks.acquire(&wallet.name).await;
            if cancel.is_cancelled() {
                return Ok(SessionOutcome::Aborted(AbortReason::Cancelled));
            }

            self.transition(SessionState::Signing);
            let chain_id = self.ctx.ledger.chain_id().await?;
            let nonce = self.ctx.ledger.nonce_of(wallet.address).await?;
            attempt.nonce = Some(nonce);
            let tx = build_mine_transaction(&attempt, call, chain_id, nonce);
            let signed = self.ctx.wallets.sign(&wallet.name, &tx).await?;

            self.transition(SessionState::Broadcasting);
            match self.ctx.ledger.broadcast(signed).await {
                Ok(tx_hash) => tx_hash,
                Err(LedgerError::Rejected { message, .. }) => {
                    return Ok(SessionOutcome::Failed(FailureReason::BroadcastRejected { message }));
                }
                Err(e) => return Err(e.into()),
            }
        };
        info!(
            "Submitted {} entries for round {} from {}: {}",
            attempt.batch_size, attempt.round, wallet.name, tx_hash
        );

        self.transition(SessionState::Confirming);
        let receipt = match self.await_receipt(tx_hash, cancel).await {
            Ok(receipt) => receipt,
            Err(reason) => return Ok(SessionOutcome::Failed(reason)),
        };
        if !receipt.success {
            return Ok(SessionOutcome::Failed(FailureReason::TransactionReverted {
                tx_hash,
                gas_used: receipt.gas_used,
            }));
        }

        let miners = match self.settle(attempt.round, cancel).await {
            Ok(miners) => miners,
            Err(error) => return Ok(SessionOutcome::Failed(FailureReason::ReconciliationFailed { tx_hash, error })),
        };
        Ok(SessionOutcome::Resolved(AttemptOutcome::reconcile(
            &attempt,
            &receipt,
            &miners,
            estimate.reward,
        )))
    }

    /// Timing and the participants of the round it names come from one snapshot.
    async fn evaluate(&self, request: &AttemptRequest) -> Result<(u64, RoundMiners, Estimate), MiningError> {
        let info = self.ctx.tracker.snapshot().await?;
        if info.is_round_open() {
            debug!("Round {} is past its interval and still takes entries", info.current_round);
        }

        let (miners, reward, unit_cost) = tokio::try_join!(
            self.ctx.contract.miners_of_round(info.current_round),
            self.ctx.contract.mining_reward(),
            self.ctx.contract.mine_cost(),
        )?;

        let estimate = self
            .policy
            .estimator()
            .estimate(miners.miner_count, reward, unit_cost, request.batch_size);
        Ok((info.current_round, miners, estimate))
    }

    async fn build(
        &self,
        wallet: &WalletInfo,
        estimate: &Estimate,
    ) -> Result<Step<(MiningAttempt, ContractCall)>, MiningError> {
        // The round may have moved since evaluation; the attempt belongs to the one open now.
        let info = self.ctx.tracker.snapshot().await?;

        let balance = self.ctx.ledger.balance_of(wallet.address).await?;
        if balance < estimate.total_cost {
            return Ok(Step::Stop(SessionOutcome::Aborted(AbortReason::InsufficientFunds {
                required: estimate.total_cost,
                available: balance,
            })));
        }

        let call = self
            .ctx
            .contract
            .mine_call(wallet.address, estimate.batch_size, estimate.total_cost);
        let gas_estimate = match self.ctx.ledger.estimate_gas(&call).await {
            Ok(gas) => gas,
            Err(LedgerError::Rejected { message, .. }) => {
                return Ok(Step::Stop(SessionOutcome::Aborted(AbortReason::CallWouldRevert { message })));
            }
            Err(e) => return Err(e.into()),
        };

        let market = self.ctx.ledger.fee_market().await?;
        let gas_price = match market {
            Some(_) => 0,
            None => self.ctx.ledger.gas_price().await?,
        };

        let attempt = MiningAttempt {
            wallet_name: wallet.name.clone(),
            wallet_address: wallet.address,
            round: info.current_round,
            batch_size: estimate.batch_size,
            unit_cost: estimate.unit_cost,
            total_value: estimate.total_cost,
            gas_limit: pad_gas_limit(gas_estimate, self.policy.gas_limit_multiplier_pct),
            fees: compute_fees(market, self.policy.base_fee_multiplier, gas_price),
            nonce: None,
        };

        if !attempt.is_funded(balance) {
            return Ok(Step::Stop(SessionOutcome::Aborted(AbortReason::InsufficientFunds {
                required: attempt.required_balance(),
                available: balance,
            })));
        }

        Ok(Step::Proceed((attempt, call)))
    }

    /// Sleeps before every poll. Transient poll failures are logged and count against the budget;
    /// any other failure ends polling with the transaction hash kept.
    async fn await_receipt(&self, tx_hash: TxHash, cancel: &CancellationToken) -> Result<Receipt, FailureReason> {
        let attempts = self.policy.poll_attempts;

        for poll in 1..=attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Stopped waiting for {}", tx_hash);
                    return Err(FailureReason::ConfirmationCancelled { tx_hash });
                }
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
            }

            match self.ctx.ledger.receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => debug!("{} pending ({}/{})", tx_hash, poll, attempts),
                Err(e) if e.is_transient() => {
                    warn!("Receipt poll {}/{} for {} failed: {}", poll, attempts, tx_hash, e)
                }
                Err(e) => return Err(FailureReason::ReconciliationFailed { tx_hash, error: e.into() }),
            }
        }

        Err(FailureReason::ConfirmationTimeout { tx_hash, attempts })
    }

    /// Re-reads the round until the contract records a winner. An unsettled round keeps a zero
    /// selected miner, which never counts as a win. A round that was never readable, or that
    /// answered with inconsistent data, is an error.
    async fn settle(&self, round: u64, cancel: &CancellationToken) -> Result<RoundMiners, MiningError> {
        let mut miners: Option<RoundMiners> = None;
        let mut last_error = None;
        let attempts = self.policy.settle_attempts.max(1);

        for read in 1..=attempts {
            match self.ctx.contract.miners_of_round(round).await {
                Ok(latest) => {
                    let settled = latest.is_settled();
                    miners = Some(latest);
                    if settled {
                        break;
                    }
                    debug!("Round {} not settled yet ({}/{})", round, read, attempts);
                }
                Err(e) if e.is_transient() => {
                    warn!("Reading round {} failed ({}/{}): {}", round, read, attempts, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e.into()),
            }

            if read == attempts {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.policy.settle_interval) => {}
            }
        }

        let miners = match (miners, last_error) {
            (Some(miners), _) => miners,
            (None, Some(e)) => return Err(e.into()),
            (None, None) => RoundMiners {
                round,
                miners: Vec::new(),
                miner_count: 0,
                selected_miner: Address::ZERO,
            },
        };
        if !miners.is_settled() {
            warn!("Round {} has no recorded winner yet, reporting as not settled", round);
        }
        Ok(miners)
    }

    fn finish(&mut self, wallet_name: &str, outcome: &SessionOutcome) -> Option<Notification> {
        match outcome {
            SessionOutcome::Resolved(resolved) => {
                self.transition(SessionState::Resolved { won: resolved.won });
                info!("{}: {}", wallet_name, outcome);
                Some(
                    Notification::new(format!("{}: {}", wallet_name, outcome))
                        .with_subject(format!("ETHC {} {} round {}", wallet_name, outcome.label(), resolved.round)),
                )
            }
            SessionOutcome::Aborted(_) => {
                self.transition(SessionState::Aborted);
                warn!("{}: {}", wallet_name, outcome);
                None
            }
            SessionOutcome::Failed(reason) => {
                self.transition(SessionState::Failed);
                error!("{}: {}", wallet_name, outcome);
                Some(
                    Notification::urgent(format!("{}: {}", wallet_name, outcome))
                        .with_subject(format!("ETHC {} {}", wallet_name, reason.label())),
                )
            }
        }
    }

    /// Connectivity losses are left to the caller to retry; everything else is relayed.
    fn fail(&mut self, wallet_name: &str, err: &MiningError) -> Option<Notification> {
        self.transition(SessionState::Failed);
        error!("{}: {}", wallet_name, err);
        if err.is_retriable() {
            return None;
        }
        Some(
            Notification::urgent(format!("{}: {}", wallet_name, err))
                .with_subject(format!("ETHC {} {}", wallet_name, err.label())),
        )
    }

    async fn notify(&self, notification: Notification) {
        match tokio::time::timeout(self.policy.notify_timeout, self.ctx.notifier.notify(&notification)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Notification failed: {}", e),
            Err(_) => warn!("Notification timed out after {:?}", self.policy.notify_timeout),
        }
    }
}
