use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{TopUpRecord, Wallet};
use crate::store::WalletStore;

const WALLETS: &str = "wallets";
const TOP_UPS: &str = "wallet_top_ups";

pub struct SupabaseWalletStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseWalletStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl WalletStore for SupabaseWalletStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        self.supabase
            .select_one(WALLETS, &format!("user_id=eq.{}", user_id))
            .await
    }

    async fn create(&self, wallet: Wallet) -> Result<Wallet> {
        let inserted: Vec<Wallet> = self
            .supabase
            .insert_ignore_duplicates(WALLETS, "user_id", serde_json::to_value(&wallet)?)
            .await?;

        match inserted.into_iter().next() {
            Some(row) => Ok(row),
            None => self
                .get(wallet.user_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("wallet {} vanished after insert", wallet.user_id)),
        }
    }

    async fn compare_and_swap(&self, expected_version: i64, next: &Wallet) -> Result<bool> {
        let filters = format!("user_id=eq.{}&version=eq.{}", next.user_id, expected_version);
        let body = json!({
            "balance": next.balance,
            "frozen": next.frozen,
            "version": next.version,
            "updated_at": next.updated_at,
        });

        let rows: Vec<Wallet> = self.supabase.update_where(WALLETS, &filters, body).await?;
        if rows.is_empty() {
            debug!("Stale wallet write for {} at version {}", next.user_id, expected_version);
        }
        Ok(!rows.is_empty())
    }

    async fn claim_top_up(&self, record: &TopUpRecord) -> Result<bool> {
        let inserted: Vec<TopUpRecord> = self
            .supabase
            .insert_ignore_duplicates(TOP_UPS, "order_id", serde_json::to_value(record)?)
            .await?;
        Ok(!inserted.is_empty())
    }

    async fn release_top_up(&self, order_id: &str) -> Result<()> {
        let filters = format!("order_id=eq.{}", urlencoding::encode(order_id));
        let _: Vec<TopUpRecord> = self.supabase.delete_where(TOP_UPS, &filters).await?;
        Ok(())
    }
}
