#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use ethc_api::prelude::*;
use ethc_client::{
    LedgerClient, LocalWalletStore, MiningContract, Notification, Notifier, NotifyError, WalletError,
    WalletInfo, WalletStore,
};
use ethc_miner::{MinerContext, SessionPolicy};

pub const CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

pub const WALLET_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const WALLET: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const WALLET_NAME: &str = "Wallet 1";

pub const OTHER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const THIRD: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

pub const ROUND: u64 = 12;
pub const CHAIN_ID: u64 = 31337;

/// Scripted result of one receipt poll.
#[derive(Debug, Clone)]
pub enum Poll {
    Pending,
    Confirmed { success: bool, gas_used: u64, effective_gas_price: u128 },
    Error,
    /// The node answers with something that is not a receipt.
    Malformed,
}

pub struct MockLedger {
    pub now: AtomicU64,
    pub balance: Mutex<U256>,
    pub nonce: AtomicU64,
    pub fee_market: Mutex<Option<FeeMarket>>,
    pub gas_price: u128,
    pub gas_estimate: Mutex<LedgerResult<u64>>,
    pub broadcast_error: Mutex<Option<LedgerError>>,
    pub polls: Mutex<VecDeque<Poll>>,
    pub broadcasts: Mutex<Vec<Bytes>>,
    pub estimates: AtomicUsize,
    pub receipt_polls: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            now: AtomicU64::new(1_030),
            balance: Mutex::new(U256::from(1_000_000_000_000_000_000u128)),
            nonce: AtomicU64::new(0),
            fee_market: Mutex::new(Some(FeeMarket { base_fee: 10, priority_fee: 1 })),
            gas_price: 7,
            gas_estimate: Mutex::new(Ok(100_000)),
            broadcast_error: Mutex::new(None),
            polls: Mutex::new(VecDeque::new()),
            broadcasts: Mutex::new(Vec::new()),
            estimates: AtomicUsize::new(0),
            receipt_polls: AtomicUsize::new(0),
        }
    }
}

impl MockLedger {
    pub fn script_polls(&self, polls: Vec<Poll>) {
        *self.polls.lock().unwrap() = polls.into();
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn chain_id(&self) -> LedgerResult<u64> {
        Ok(CHAIN_ID)
    }

    async fn now(&self) -> LedgerResult<u64> {
        Ok(self.now.load(Ordering::SeqCst))
    }

    async fn balance_of(&self, _address: Address) -> LedgerResult<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn nonce_of(&self, _address: Address) -> LedgerResult<u64> {
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn fee_market(&self) -> LedgerResult<Option<FeeMarket>> {
        Ok(*self.fee_market.lock().unwrap())
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _call: &ContractCall) -> LedgerResult<u64> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        self.gas_estimate.lock().unwrap().clone()
    }

    async fn broadcast(&self, signed: Bytes) -> LedgerResult<TxHash> {
        if let Some(e) = self.broadcast_error.lock().unwrap().clone() {
            return Err(e);
        }
        let hash = keccak256(&signed);
        self.broadcasts.lock().unwrap().push(signed);
        // The node now counts the pending transaction.
        self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<Receipt>> {
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        let poll = self.polls.lock().unwrap().pop_front().unwrap_or(Poll::Pending);
        match poll {
            Poll::Pending => Ok(None),
            Poll::Confirmed { success, gas_used, effective_gas_price } => Ok(Some(Receipt {
                tx_hash,
                success,
                gas_used,
                effective_gas_price,
                block_number: Some(100),
            })),
            Poll::Error => Err(LedgerError::transient("eth_getTransactionReceipt", "connection reset")),
            Poll::Malformed => Err(LedgerError::invariant("eth_getTransactionReceipt", "missing status")),
        }
    }
}

pub struct MockContract {
    pub round: AtomicU64,
    pub last_round_at: AtomicU64,
    pub interval: LedgerResult<u64>,
    pub cost: U256,
    pub reward: U256,
    pub miners: Mutex<Vec<Address>>,
    /// Selected miner per `miners_of_round` call; the last entry repeats.
    pub selected: Mutex<Vec<Address>>,
    pub miners_reads: Mutex<Vec<u64>>,
    pub fail_reads: Mutex<Option<LedgerError>>,
    /// Rounds returned by successive `current_round` calls before falling back to `round`.
    pub round_script: Mutex<VecDeque<u64>>,
    /// Errors for specific `miners_of_round` calls, by call index.
    pub miners_failures: Mutex<HashMap<usize, LedgerError>>,
}

impl Default for MockContract {
    fn default() -> Self {
        Self {
            round: AtomicU64::new(ROUND),
            last_round_at: AtomicU64::new(1_000),
            interval: Ok(60),
            cost: U256::from(10),
            reward: U256::from(1_000),
            miners: Mutex::new(vec![OTHER, THIRD]),
            selected: Mutex::new(vec![Address::ZERO]),
            miners_reads: Mutex::new(Vec::new()),
            fail_reads: Mutex::new(None),
            round_script: Mutex::new(VecDeque::new()),
            miners_failures: Mutex::new(HashMap::new()),
        }
    }
}

impl MockContract {
    pub fn select(&self, script: Vec<Address>) {
        *self.selected.lock().unwrap() = script;
    }

    pub fn script_rounds(&self, rounds: Vec<u64>) {
        *self.round_script.lock().unwrap() = rounds.into();
    }

    pub fn fail_miners_read(&self, call: usize, err: LedgerError) {
        self.miners_failures.lock().unwrap().insert(call, err);
    }

    pub fn reads(&self) -> Vec<u64> {
        self.miners_reads.lock().unwrap().clone()
    }

    fn check(&self) -> LedgerResult<()> {
        match self.fail_reads.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MiningContract for MockContract {
    fn address(&self) -> Address {
        CONTRACT
    }

    async fn current_round(&self) -> LedgerResult<u64> {
        self.check()?;
        if let Some(round) = self.round_script.lock().unwrap().pop_front() {
            self.round.store(round, Ordering::SeqCst);
        }
        Ok(self.round.load(Ordering::SeqCst))
    }

    async fn last_round_at(&self) -> LedgerResult<u64> {
        self.check()?;
        Ok(self.last_round_at.load(Ordering::SeqCst))
    }

    async fn round_interval(&self) -> LedgerResult<u64> {
        self.interval.clone()
    }

    async fn mine_cost(&self) -> LedgerResult<U256> {
        self.check()?;
        Ok(self.cost)
    }

    async fn mining_reward(&self) -> LedgerResult<U256> {
        self.check()?;
        Ok(self.reward)
    }

    async fn miners_of_round(&self, round: u64) -> LedgerResult<RoundMiners> {
        self.check()?;
        let call = {
            let mut reads = self.miners_reads.lock().unwrap();
            reads.push(round);
            reads.len() - 1
        };
        if let Some(e) = self.miners_failures.lock().unwrap().get(&call).cloned() {
            return Err(e);
        }
        let selected = {
            let script = self.selected.lock().unwrap();
            script.get(call).or(script.last()).copied().unwrap_or(Address::ZERO)
        };
        let miners = self.miners.lock().unwrap().clone();

        Ok(RoundMiners {
            round,
            miner_count: miners.len() as u64,
            miners,
            selected_miner: selected,
        })
    }

    async fn halving_info(&self) -> LedgerResult<HalvingInfo> {
        Ok(HalvingInfo {
            current_round: self.round.load(Ordering::SeqCst),
            last_halving_round: 0,
            next_halving_round: 210_000,
            halving_interval: 210_000,
        })
    }
}

/// Real local signing, with the nonce of every signed transaction recorded.
pub struct RecordingWallets {
    pub store: LocalWalletStore,
    pub signed_nonces: Mutex<Vec<u64>>,
    pub sign_delay: Duration,
}

impl RecordingWallets {
    pub fn new() -> Self {
        let mut store = LocalWalletStore::new();
        store.insert(WALLET_NAME, WALLET_KEY).unwrap();
        Self {
            store,
            signed_nonces: Mutex::new(Vec::new()),
            sign_delay: Duration::ZERO,
        }
    }

    pub fn with_sign_delay(mut self, delay: Duration) -> Self {
        self.sign_delay = delay;
        self
    }

    pub fn sign_count(&self) -> usize {
        self.signed_nonces.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletStore for RecordingWallets {
    fn resolve(&self, name: &str) -> Result<WalletInfo, WalletError> {
        self.store.resolve(name)
    }

    async fn sign(&self, name: &str, tx: &UnsignedTransaction) -> Result<Bytes, WalletError> {
        self.signed_nonces.lock().unwrap().push(tx.nonce);
        if !self.sign_delay.is_zero() {
            tokio::time::sleep(self.sign_delay).await;
        }
        self.store.sign(name, tx).await
    }

    fn names(&self) -> Vec<String> {
        self.store.names()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub contract: Arc<MockContract>,
    pub wallets: Arc<RecordingWallets>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_wallets(RecordingWallets::new())
    }

    pub fn with_wallets(wallets: RecordingWallets) -> Self {
        Self {
            ledger: Arc::new(MockLedger::default()),
            contract: Arc::new(MockContract::default()),
            wallets: Arc::new(wallets),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn with_contract(mut self, contract: MockContract) -> Self {
        self.contract = Arc::new(contract);
        self
    }

    pub fn with_ledger(mut self, ledger: MockLedger) -> Self {
        self.ledger = Arc::new(ledger);
        self
    }

    pub fn context(&self) -> MinerContext {
        MinerContext::new(
            self.ledger.clone(),
            self.contract.clone(),
            self.wallets.clone(),
            self.notifier.clone(),
            60,
        )
    }
}

/// Default policy with millisecond waits.
pub fn fast_policy() -> SessionPolicy {
    SessionPolicy {
        poll_interval: Duration::from_millis(1),
        settle_interval: Duration::from_millis(1),
        notify_timeout: Duration::from_millis(200),
        ..SessionPolicy::default()
    }
}
