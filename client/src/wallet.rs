use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use ethc_api::types::UnsignedTransaction;
use crate::mine::transaction_request;

/// Prefix of the environment variables holding wallet entries.
pub const WALLET_ENV_PREFIX: &str = "WALLET_";

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("No wallet found with name: {0}")]
    UnknownWallet(String),
    #[error("Invalid private key for wallet {name}: {reason}")]
    InvalidKey { name: String, reason: String },
    #[error("Invalid wallet entry {key}: {reason}")]
    InvalidConfig { key: String, reason: String },
    #[error("Failed to sign with wallet {name}: {reason}")]
    Signing { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub name: String,
    pub address: Address,
    pub balance_hint: Option<U256>,
}

/// Maps human-readable wallet names to addresses and signs on their behalf.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Name lookup is case-insensitive.
    fn resolve(&self, name: &str) -> Result<WalletInfo, WalletError>;

    /// Signs `tx` and returns the EIP-2718 encoded bytes ready for broadcast.
    async fn sign(&self, name: &str, tx: &UnsignedTransaction) -> Result<Bytes, WalletError>;

    fn names(&self) -> Vec<String>;
}

#[derive(Debug, Deserialize)]
struct WalletEntry {
    name: String,
    public_key: String,
    private_key: String,
}

struct LocalWallet {
    name: String,
    signer: PrivateKeySigner,
}

/// Wallets held in memory, loaded from `WALLET_*` JSON entries.
#[derive(Default)]
pub struct LocalWalletStore {
    wallets: Vec<LocalWallet>,
}

impl LocalWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a wallet from a hex private key and returns its address.
    pub fn insert(&mut self, name: &str, private_key: &str) -> Result<Address, WalletError> {
        let signer: PrivateKeySigner = private_key.trim().parse().map_err(|e| WalletError::InvalidKey {
            name: name.to_string(),
            reason: format!("{}", e),
        })?;
        let address = signer.address();

        self.wallets.retain(|w| !w.name.eq_ignore_ascii_case(name));
        self.wallets.push(LocalWallet { name: name.to_string(), signer });

        info!("Loaded wallet: {} ({})", name, address);
        Ok(address)
    }

    /// Loads every `WALLET_*` variable. Entries that are not valid JSON, or miss a field, are
    /// skipped with a warning; an entry whose declared address does not match its key fails.
    pub fn from_vars<I>(vars: I) -> Result<Self, WalletError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(WALLET_ENV_PREFIX))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut store = Self::new();
        for (key, value) in entries {
            let entry: WalletEntry = match serde_json::from_str(&value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping {}: invalid wallet JSON ({})", key, e);
                    continue;
                }
            };

            let declared: Address = entry.public_key.trim().parse().map_err(|e| WalletError::InvalidConfig {
                key: key.clone(),
                reason: format!("public_key is not an address: {}", e),
            })?;

            let address = store.insert(&entry.name, &entry.private_key)?;
            if address != declared {
                return Err(WalletError::InvalidConfig {
                    key,
                    reason: format!("public_key {} does not match private key address {}", declared, address),
                });
            }
        }

        debug!("Loaded {} wallets", store.len());
        Ok(store)
    }

    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_vars(std::env::vars())
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.wallets.iter().map(|w| w.signer.address()).collect()
    }

    /// Case-insensitive by construction: addresses compare as bytes.
    pub fn name_of(&self, address: Address) -> Option<&str> {
        self.wallets
            .iter()
            .find(|w| w.signer.address() == address)
            .map(|w| w.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    fn find(&self, name: &str) -> Result<&LocalWallet, WalletError> {
        self.wallets
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                warn!("No wallet found with name: {}", name);
                WalletError::UnknownWallet(name.to_string())
            })
    }
}

#[async_trait]
impl WalletStore for LocalWalletStore {
    fn resolve(&self, name: &str) -> Result<WalletInfo, WalletError> {
        let wallet = self.find(name)?;
        Ok(WalletInfo {
            name: wallet.name.clone(),
            address: wallet.signer.address(),
            balance_hint: None,
        })
    }

    async fn sign(&self, name: &str, tx: &UnsignedTransaction) -> Result<Bytes, WalletError> {
        let wallet = self.find(name)?;
        let address = wallet.signer.address();
        if tx.call.from != address {
            return Err(WalletError::Signing {
                name: wallet.name.clone(),
                reason: format!("transaction is from {}, wallet is {}", tx.call.from, address),
            });
        }

        info!("Signing transaction with wallet: {}", wallet.name);
        let signer = EthereumWallet::from(wallet.signer.clone());
        let envelope = transaction_request(tx)
            .build(&signer)
            .await
            .map_err(|e| WalletError::Signing {
                name: wallet.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(envelope.encoded_2718().into())
    }

    fn names(&self) -> Vec<String> {
        self.wallets.iter().map(|w| w.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use ethc_api::prelude::*;

    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ADDR_0: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const ADDR_1: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

    fn entry(name: &str, public_key: &str, private_key: &str) -> String {
        serde_json::json!({
            "name": name,
            "public_key": public_key,
            "private_key": private_key,
        })
        .to_string()
    }

    fn vars() -> Vec<(String, String)> {
        vec![
            ("WALLET_2".to_string(), entry("Wallet 2", "0x70997970c51812dc3a010c7d01b50e0d17dc79c8", KEY_1)),
            ("WALLET_1".to_string(), entry("Wallet 1", "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266", KEY_0)),
            ("WALLET_BROKEN".to_string(), "{not json".to_string()),
            ("HOST".to_string(), "localhost".to_string()),
        ]
    }

    fn unsigned(from: Address, fees: FeeParameters) -> UnsignedTransaction {
        UnsignedTransaction {
            chain_id: 31337,
            nonce: 0,
            call: build_mine_call(CONTRACT, from, 2, U256::from(20)),
            gas_limit: 120_000,
            fees,
        }
    }

    #[test]
    fn test_load_from_vars() -> Result<(), WalletError> {
        let store = LocalWalletStore::from_vars(vars())?;
        assert_eq!(store.len(), 2);
        assert_eq!(store.names(), vec!["Wallet 1".to_string(), "Wallet 2".to_string()]);
        assert_eq!(store.addresses(), vec![ADDR_0, ADDR_1]);
        assert_eq!(store.name_of(ADDR_1), Some("Wallet 2"));
        Ok(())
    }

    #[test]
    fn test_resolve_is_case_insensitive() -> Result<(), WalletError> {
        let store = LocalWalletStore::from_vars(vars())?;
        let info = store.resolve("wallet 1")?;
        assert_eq!(info.address, ADDR_0);
        assert_eq!(info.name, "Wallet 1");

        let result = store.resolve("Wallet 9");
        assert!(matches!(result, Err(WalletError::UnknownWallet(name)) if name == "Wallet 9"));
        Ok(())
    }

    #[test]
    fn test_mismatched_public_key_is_rejected() {
        let vars = vec![(
            "WALLET_1".to_string(),
            entry("Wallet 1", "0x70997970C51812dc3A010C7d01b50e0d17dc79C8", KEY_0),
        )];
        let result = LocalWalletStore::from_vars(vars);
        assert!(matches!(result, Err(WalletError::InvalidConfig { key, .. }) if key == "WALLET_1"));
    }

    #[test]
    fn test_missing_field_is_skipped() -> Result<(), WalletError> {
        let vars = vec![(
            "WALLET_1".to_string(),
            serde_json::json!({ "name": "Wallet 1", "public_key": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266" }).to_string(),
        )];
        let store = LocalWalletStore::from_vars(vars)?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_private_key() {
        let mut store = LocalWalletStore::new();
        let result = store.insert("bad", "0x1234");
        assert!(matches!(result, Err(WalletError::InvalidKey { .. })));
    }

    #[tokio::test]
    async fn test_sign_eip1559() -> Result<(), WalletError> {
        let store = LocalWalletStore::from_vars(vars())?;
        let tx = unsigned(ADDR_1, FeeParameters::Eip1559 { max_fee_per_gas: 30_000_000_000, max_priority_fee_per_gas: 1_000_000_000 });

        let signed = store.sign("Wallet 2", &tx).await?;
        assert_eq!(signed[0], 0x02);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_legacy() -> Result<(), WalletError> {
        let store = LocalWalletStore::from_vars(vars())?;
        let tx = unsigned(ADDR_0, FeeParameters::Legacy { gas_price: 20_000_000_000 });

        let signed = store.sign("Wallet 1", &tx).await?;
        // RLP list header, no type byte.
        assert!(signed[0] >= 0xc0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_rejects_foreign_sender() -> Result<(), WalletError> {
        let store = LocalWalletStore::from_vars(vars())?;
        let tx = unsigned(ADDR_0, FeeParameters::Legacy { gas_price: 1 });

        let result = store.sign("Wallet 2", &tx).await;
        assert!(matches!(result, Err(WalletError::Signing { .. })));
        Ok(())
    }
}
