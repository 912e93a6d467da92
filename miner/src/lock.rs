use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per wallet name. Held from the nonce query until the signed transaction has
/// been handed to the node, so two attempts from the same wallet never race for a nonce.
#[derive(Clone, Default)]
pub struct WalletLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names are matched case-insensitively, like wallet lookups.
    pub async fn acquire(&self, wallet_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(wallet_name.to_lowercase()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
