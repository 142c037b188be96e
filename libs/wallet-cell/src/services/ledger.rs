// libs/wallet-cell/src/services/ledger.rs
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{TopUpRecord, Wallet};
use crate::store::WalletStore;

const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 8;

/// Wallet ledger. Each operation is a compare-and-swap on the wallet version,
/// re-read and re-checked on contention, so concurrent freezes against one
/// wallet can never both pass the availability check.
pub struct LedgerService {
    store: Arc<dyn WalletStore>,
    max_retry_attempts: u32,
}

impl LedgerService {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self {
            store,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }

    pub fn with_max_retries(store: Arc<dyn WalletStore>, max_retry_attempts: u32) -> Self {
        Self {
            store,
            max_retry_attempts: max_retry_attempts.max(1),
        }
    }

    pub async fn wallet(&self, user_id: Uuid) -> Result<Wallet, LedgerError> {
        self.store
            .get(user_id)
            .await?
            .ok_or(LedgerError::WalletNotFound(user_id))
    }

    /// Returns the wallet, opening an empty one for first-time users.
    pub async fn ensure_wallet(&self, user_id: Uuid) -> Result<Wallet, LedgerError> {
        if let Some(wallet) = self.store.get(user_id).await? {
            return Ok(wallet);
        }
        info!("Opening wallet for user {}", user_id);
        Ok(self.store.create(Wallet::new(user_id)).await?)
    }

    pub async fn available(&self, user_id: Uuid) -> Result<Decimal, LedgerError> {
        Ok(self.wallet(user_id).await?.available())
    }

    #[instrument(skip(self))]
    pub async fn freeze(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        self.apply(user_id, "freeze", false, |w| w.freeze(amount)).await
    }

    /// Never fails on the amount: over-release clamps at zero.
    #[instrument(skip(self))]
    pub async fn unfreeze(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        if amount.is_zero() {
            return self.wallet(user_id).await;
        }
        self.apply(user_id, "unfreeze", false, |w| w.unfreeze(amount)).await
    }

    #[instrument(skip(self))]
    pub async fn commit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        self.apply(user_id, "commit", false, |w| w.commit(amount)).await
    }

    #[instrument(skip(self))]
    pub async fn credit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        self.apply(user_id, "credit", true, |w| w.credit(amount)).await
    }

    /// Credits a verified gateway payment exactly once per order.
    #[instrument(skip(self, record), fields(order_id = %record.order_id))]
    pub async fn credit_top_up(&self, record: TopUpRecord) -> Result<Wallet, LedgerError> {
        if record.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(record.amount));
        }
        if !self.store.claim_top_up(&record).await? {
            warn!("Top-up for order {} already credited", record.order_id);
            return Err(LedgerError::AlreadyCredited(record.order_id));
        }
        info!("Crediting top-up of {} to {}", record.amount, record.user_id);
        match self.credit(record.user_id, record.amount).await {
            Ok(wallet) => Ok(wallet),
            Err(e) => {
                warn!("Top-up credit for order {} failed, releasing claim: {}", record.order_id, e);
                if let Err(release) = self.store.release_top_up(&record.order_id).await {
                    error!("Could not release top-up claim for order {}: {}", record.order_id, release);
                }
                Err(e)
            }
        }
    }

    pub async fn restore_commit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        self.apply(user_id, "restore_commit", false, |w| w.restore_commit(amount)).await
    }

    pub async fn reverse_credit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        self.apply(user_id, "reverse_credit", false, |w| w.reverse_credit(amount)).await
    }

    async fn apply<F>(
        &self,
        user_id: Uuid,
        operation: &str,
        create_missing: bool,
        mutate: F,
    ) -> Result<Wallet, LedgerError>
    where
        F: Fn(&Wallet) -> Result<Wallet, LedgerError>,
    {
        for attempt in 1..=self.max_retry_attempts {
            let current = if create_missing {
                self.ensure_wallet(user_id).await?
            } else {
                self.wallet(user_id).await?
            };

            let next = mutate(&current)?;

            if self.store.compare_and_swap(current.version, &next).await? {
                debug!(
                    "Ledger {} on {}: balance {} -> {}, frozen {} -> {}",
                    operation, user_id, current.balance, next.balance, current.frozen, next.frozen
                );
                return Ok(next);
            }

            warn!(
                "Ledger {} on {} lost a race at version {}, retrying attempt {}/{}",
                operation, user_id, current.version, attempt, self.max_retry_attempts
            );
            sleep(Duration::from_millis(5 * attempt as u64)).await;
        }

        Err(LedgerError::Contention(user_id))
    }
}
