use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::U256;
use clap::{Args, Parser, Subcommand, ValueEnum};

use ethc_api::prelude::*;
use ethc_client::ParseMode;
use ethc_miner::SessionPolicy;

#[derive(Parser)]
#[command(
    name = "ethc",
    about = "Prices every ETHC round and mines it when the odds pay.",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'u',
        long = "rpc",
        global = true,
        help = "Endpoint to use: l (localnet), m (mainnet), s (sepolia),\n or a custom RPC URL. Defaults to ETH_RPC_URL"
    )]
    pub endpoint: Option<Endpoint>,

    #[arg(
        short = 'c',
        long = "contract",
        global = true,
        help = "Mining contract address. Defaults to ETHC_MINER_CONTRACT_ADDRESS"
    )]
    pub contract: Option<String>,

    #[arg(
        long = "cost-source",
        default_value = "function",
        global = true,
        help = "Where the entry price is read from: function (mineCost), constant (MINE_COST),\n fixed (0.0001 ETH), or an amount in wei"
    )]
    pub cost_source: CostSourceArg,

    #[arg(short = 'v', long = "verbose", help = "Print verbose output", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {

    // Read Commands

    Stats {},

    Round {
        #[arg(help = "Round to inspect, defaults to the current round")]
        round: Option<u64>,
    },

    Halving {},

    Estimate {
        #[arg(short = 'b', long = "batch", help = "Entries to price, defaults to the miner-count heuristic")]
        batch: Option<u64>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    Wallets {},

    Watch {
        #[arg(short = 'n', long = "count", default_value = "10", help = "Number of snapshots to print")]
        count: u32,

        #[arg(short = 'i', long = "interval", default_value = "10", help = "Seconds between snapshots")]
        interval: u64,
    },

    // Mining Commands

    Mine {
        #[arg(short = 'w', long = "wallet", help = "Name of the wallet to mine with")]
        wallet: String,

        #[arg(short = 'b', long = "batch", help = "Entries to buy, defaults to the miner-count heuristic")]
        batch: Option<u64>,

        #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt")]
        yes: bool,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    Run {
        #[arg(short = 'w', long = "wallet", help = "Wallets to mine with, defaults to every configured wallet")]
        wallets: Vec<String>,

        #[arg(short = 'b', long = "batch", help = "Entries per attempt, defaults to the miner-count heuristic")]
        batch: Option<u64>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    // Operator Commands

    #[command(subcommand)]
    Notify(NotifyCommands),
}

#[derive(Subcommand)]
pub enum NotifyCommands {
    Email {
        #[arg(help = "Message body")]
        message: String,

        #[arg(short = 's', long = "subject")]
        subject: Option<String>,

        #[arg(long = "urgent")]
        urgent: bool,
    },

    Telegram {
        #[arg(
            help = "Message text",
            required_unless_present_any = ["photo", "document", "sticker"],
            conflicts_with_all = ["photo", "document", "sticker"]
        )]
        message: Option<String>,

        #[arg(long = "photo", help = "Photo URL or file id", conflicts_with_all = ["document", "sticker"])]
        photo: Option<String>,

        #[arg(long = "document", help = "Document URL or file id", conflicts_with_all = ["photo", "sticker"])]
        document: Option<String>,

        #[arg(long = "sticker", help = "Sticker URL or file id", conflicts_with_all = ["photo", "document"])]
        sticker: Option<String>,

        #[arg(long = "caption", help = "Caption for a photo or document")]
        caption: Option<String>,

        #[arg(long = "parse-mode", value_enum)]
        parse_mode: Option<ParseModeArg>,
    },
}

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[arg(long = "min-batch", default_value_t = MIN_BATCH_SIZE)]
    pub min_batch: u64,

    #[arg(long = "max-batch", default_value_t = MAX_BATCH_SIZE)]
    pub max_batch: u64,

    #[arg(long = "gas-multiplier", default_value_t = GAS_LIMIT_MULTIPLIER_PCT, help = "Gas limit as a percentage of the estimate")]
    pub gas_multiplier_pct: u64,

    #[arg(long = "poll-interval", default_value_t = RECEIPT_POLL_INTERVAL_SECONDS, help = "Seconds between receipt polls")]
    pub poll_interval: u64,

    #[arg(long = "poll-attempts", default_value_t = RECEIPT_POLL_ATTEMPTS)]
    pub poll_attempts: u32,
}

impl PolicyArgs {
    pub fn to_policy(&self) -> SessionPolicy {
        SessionPolicy {
            min_batch_size: self.min_batch,
            max_batch_size: self.max_batch,
            gas_limit_multiplier_pct: self.gas_multiplier_pct,
            poll_interval: Duration::from_secs(self.poll_interval),
            poll_attempts: self.poll_attempts,
            ..SessionPolicy::default()
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ParseModeArg {
    Html,
    Markdown,
}

impl From<ParseModeArg> for ParseMode {
    fn from(arg: ParseModeArg) -> Self {
        match arg {
            ParseModeArg::Html => ParseMode::Html,
            ParseModeArg::Markdown => ParseMode::Markdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Localnet,
    Mainnet,
    Sepolia,
    Custom(String),
}

impl Endpoint {
    /// Mainnet and Sepolia go through Alchemy and need an API key.
    pub fn rpc_url(&self, alchemy_key: Option<&str>) -> Result<String, String> {
        match (self, alchemy_key) {
            (Endpoint::Localnet, _) => Ok(LOCALNET_RPC_URL.to_string()),
            (Endpoint::Mainnet, Some(key)) => Ok(format!("{}{}", ALCHEMY_MAINNET_URL, key)),
            (Endpoint::Sepolia, Some(key)) => Ok(format!("{}{}", ALCHEMY_SEPOLIA_URL, key)),
            (Endpoint::Custom(url), _) => Ok(url.clone()),
            (_, None) => Err("ALCHEMY_API_KEY is required for mainnet and sepolia".to_string()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l" => Ok(Endpoint::Localnet),
            "m" => Ok(Endpoint::Mainnet),
            "s" => Ok(Endpoint::Sepolia),
            s if s.starts_with("http://") || s.starts_with("https://") => Ok(Endpoint::Custom(s.to_string())),
            _ => Err(format!(
                "Invalid endpoint value: '{}'. Use l, m, s, or a valid RPC URL (http:// or https://)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostSourceArg(pub CostSource);

impl FromStr for CostSourceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" | "mineCost" => Ok(CostSourceArg(CostSource::Function)),
            "constant" | "MINE_COST" => Ok(CostSourceArg(CostSource::Constant)),
            "fixed" => Ok(CostSourceArg(CostSource::Fixed(FALLBACK_MINE_COST))),
            s => U256::from_str(s)
                .map(|wei| CostSourceArg(CostSource::Fixed(wei)))
                .map_err(|_| format!(
                    "Invalid cost source: '{}'. Use function, constant, fixed, or an amount in wei",
                    s
                )),
        }
    }
}
