use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{TopUpRecord, Wallet};

pub mod memory;
pub mod supabase;

pub use memory::MemoryWalletStore;
pub use supabase::SupabaseWalletStore;

/// Persistence for wallets. Every mutation goes through `compare_and_swap`
/// so a read-modify-write never spans two unconditional round trips.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<Wallet>>;

    /// Creates the wallet unless one already exists; returns the stored row.
    async fn create(&self, wallet: Wallet) -> Result<Wallet>;

    /// Writes `next` only if the stored version still equals `expected_version`.
    async fn compare_and_swap(&self, expected_version: i64, next: &Wallet) -> Result<bool>;

    /// Records a credited top-up. Returns false when the order was already recorded.
    async fn claim_top_up(&self, record: &TopUpRecord) -> Result<bool>;

    /// Drops a claim whose credit never landed so the payment can be retried.
    async fn release_top_up(&self, order_id: &str) -> Result<()>;
}
