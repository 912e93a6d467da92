use std::env;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{anyhow, Result};

use ethc_api::prelude::*;
use ethc_client::{
    is_dev_host, EmailNotifier, LocalWalletStore, NotifierSet, NotifyError, TelegramNotifier,
};

use crate::cli::Endpoint;

pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
pub const MINER_CONTRACT_ADDRESS: &str = "ETHC_MINER_CONTRACT_ADDRESS";
pub const TOKEN_CONTRACT_ADDRESS: &str = "ETHC_ERC_20_CONTRACT_ADDRESS";
pub const SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
pub const DEV_EMAIL: &str = "DEV_EMAIL";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_ADMIN_CHAT_ID: &str = "TELEGRAM_ADMIN_CHAT_ID";
pub const HOST: &str = "HOST";

/// Non-empty value of `key`.
pub fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// An explicit endpoint wins, then `ETH_RPC_URL`, then Alchemy mainnet, then localnet.
pub fn resolve_rpc_url(
    endpoint: Option<&Endpoint>,
    eth_rpc_url: Option<String>,
    alchemy_key: Option<String>,
) -> Result<String> {
    match (endpoint, eth_rpc_url, alchemy_key) {
        (Some(endpoint), _, key) => endpoint.rpc_url(key.as_deref()).map_err(|e| anyhow!(e)),
        (None, Some(url), _) => Ok(url),
        (None, None, Some(key)) => Ok(format!("{}{}", ALCHEMY_MAINNET_URL, key)),
        (None, None, None) => Ok(LOCALNET_RPC_URL.to_string()),
    }
}

pub fn rpc_url(endpoint: Option<&Endpoint>) -> Result<String> {
    resolve_rpc_url(endpoint, env_var(ETH_RPC_URL), env_var(ALCHEMY_API_KEY))
}

/// Hides the API key of a keyed provider URL.
pub fn redact_url(url: &str) -> String {
    match url.find("/v2/") {
        Some(idx) if idx + 4 < url.len() => format!("{}/v2/***", &url[..idx]),
        _ => url.to_string(),
    }
}

pub fn parse_address(key: &str, value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid address in {}: '{}' ({})", key, value, e))
}

pub fn contract_address(flag: Option<&str>) -> Result<Address> {
    match flag {
        Some(value) => parse_address("--contract", value),
        None => {
            let value = env_var(MINER_CONTRACT_ADDRESS)
                .ok_or_else(|| anyhow!("{} is not set and no --contract was given", MINER_CONTRACT_ADDRESS))?;
            parse_address(MINER_CONTRACT_ADDRESS, &value)
        }
    }
}

pub fn token_address() -> Result<Option<Address>> {
    env_var(TOKEN_CONTRACT_ADDRESS)
        .map(|value| parse_address(TOKEN_CONTRACT_ADDRESS, &value))
        .transpose()
}

pub fn load_wallets() -> Result<LocalWalletStore> {
    LocalWalletStore::from_env().map_err(|e| anyhow!("Failed to load wallets: {}", e))
}

pub fn is_dev() -> bool {
    is_dev_host(env_var(HOST).as_deref())
}

pub fn email_notifier() -> Result<EmailNotifier, NotifyError> {
    match (env_var(SENDGRID_API_KEY), env_var(DEV_EMAIL)) {
        (Some(key), Some(email)) => Ok(EmailNotifier::new(&key, &email, is_dev())),
        _ => Err(NotifyError::NotConfigured("email")),
    }
}

pub fn telegram_notifier() -> Result<TelegramNotifier, NotifyError> {
    match (env_var(TELEGRAM_BOT_TOKEN), env_var(TELEGRAM_ADMIN_CHAT_ID)) {
        (Some(token), Some(chat_id)) => Ok(TelegramNotifier::new(&token, &chat_id, is_dev())),
        _ => Err(NotifyError::NotConfigured("telegram")),
    }
}

/// Every channel with complete configuration. Missing channels are skipped.
pub fn notifier_set() -> NotifierSet {
    let mut set = NotifierSet::new();
    match email_notifier() {
        Ok(email) => set = set.with(Arc::new(email)),
        Err(e) => log::debug!("{}", e),
    }
    match telegram_notifier() {
        Ok(telegram) => set = set.with(Arc::new(telegram)),
        Err(e) => log::debug!("{}", e),
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rpc_url() {
        assert_eq!(resolve_rpc_url(None, None, None).unwrap(), LOCALNET_RPC_URL);
        assert_eq!(
            resolve_rpc_url(None, Some("http://node:8545".to_string()), Some("key".to_string())).unwrap(),
            "http://node:8545"
        );
        assert_eq!(
            resolve_rpc_url(None, None, Some("key".to_string())).unwrap(),
            "https://eth-mainnet.g.alchemy.com/v2/key"
        );
        assert_eq!(
            resolve_rpc_url(Some(&Endpoint::Sepolia), Some("http://node:8545".to_string()), Some("key".to_string())).unwrap(),
            "https://eth-sepolia.g.alchemy.com/v2/key"
        );
        assert!(resolve_rpc_url(Some(&Endpoint::Mainnet), None, None).is_err());
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(redact_url("https://eth-mainnet.g.alchemy.com/v2/secret"), "https://eth-mainnet.g.alchemy.com/v2/***");
        assert_eq!(redact_url("http://127.0.0.1:8545"), "http://127.0.0.1:8545");
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("X", " 0x5FbDB2315678afecb367f032d93F642f64180aa3 ").is_ok());
        assert!(parse_address("X", "0x1234").is_err());
    }
}
