use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{TopUpRecord, Wallet};
use crate::store::WalletStore;

/// Process-local wallet store used for tests and `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryWalletStore {
    wallets: RwLock<HashMap<Uuid, Wallet>>,
    top_ups: RwLock<HashMap<String, TopUpRecord>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a wallet without version checks.
    pub async fn put(&self, wallet: Wallet) {
        self.wallets.write().await.insert(wallet.user_id, wallet);
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self.wallets.read().await.get(&user_id).cloned())
    }

    async fn create(&self, wallet: Wallet) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        let stored = wallets.entry(wallet.user_id).or_insert(wallet);
        Ok(stored.clone())
    }

    async fn compare_and_swap(&self, expected_version: i64, next: &Wallet) -> Result<bool> {
        let mut wallets = self.wallets.write().await;
        match wallets.get_mut(&next.user_id) {
            Some(current) if current.version == expected_version => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_top_up(&self, record: &TopUpRecord) -> Result<bool> {
        let mut top_ups = self.top_ups.write().await;
        if top_ups.contains_key(&record.order_id) {
            return Ok(false);
        }
        top_ups.insert(record.order_id.clone(), record.clone());
        Ok(true)
    }

    async fn release_top_up(&self, order_id: &str) -> Result<()> {
        self.top_ups.write().await.remove(order_id);
        Ok(())
    }
}
