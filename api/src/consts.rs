use alloy::primitives::U256;

pub const ONE_SECOND: u64                  = 1;
pub const ONE_MINUTE: u64                  = 60 * ONE_SECOND;

// -- Round timing --

pub const ROUND_INTERVAL_SECONDS: u64      = ONE_MINUTE;

// -- Economics --

pub const WEI_PER_ETHER: u128              = 1_000_000_000_000_000_000;
pub const FALLBACK_MINE_COST_WEI: u128     = WEI_PER_ETHER / 10_000; // 0.0001 ETH

pub const FALLBACK_MINE_COST: U256         = U256::from_limbs([FALLBACK_MINE_COST_WEI as u64, 0, 0, 0]);

// -- Batch sizing --

pub const MIN_BATCH_SIZE: u64              = 10;
pub const MAX_BATCH_SIZE: u64              = 50;
pub const BATCH_MINER_DIVISOR: u64         = 3;

// -- Gas and fees --

pub const GAS_LIMIT_MULTIPLIER_PCT: u64    = 120;
pub const BASE_FEE_MULTIPLIER: u128        = 2;

// -- Confirmation --

pub const RECEIPT_POLL_INTERVAL_SECONDS: u64 = 10;
pub const RECEIPT_POLL_ATTEMPTS: u32       = 5;

pub const SETTLE_POLL_INTERVAL_SECONDS: u64 = 20;
pub const SETTLE_POLL_ATTEMPTS: u32        = 3;

pub const NOTIFY_TIMEOUT_SECONDS: u64      = 5;

// -- Endpoints --

pub const LOCALNET_RPC_URL: &str           = "http://127.0.0.1:8545";
pub const ALCHEMY_MAINNET_URL: &str        = "https://eth-mainnet.g.alchemy.com/v2/";
pub const ALCHEMY_SEPOLIA_URL: &str        = "https://eth-sepolia.g.alchemy.com/v2/";
