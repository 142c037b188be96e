// libs/wallet-cell/src/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

// ==============================================================================
// WALLET
// ==============================================================================

/// Per-user wallet. `frozen` is money reserved against open reservations and
/// is always covered by `balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub frozen: Decimal,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            frozen: Decimal::ZERO,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn available(&self) -> Decimal {
        self.balance - self.frozen
    }

    pub fn freeze(&self, amount: Decimal) -> Result<Wallet, LedgerError> {
        ensure_positive(amount)?;
        if amount > self.available() {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.available(),
            });
        }
        Ok(self.next(self.balance, self.frozen + amount))
    }

    /// Releases up to `amount`; over-release clamps to zero.
    pub fn unfreeze(&self, amount: Decimal) -> Result<Wallet, LedgerError> {
        if amount.is_sign_negative() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let frozen = (self.frozen - amount).max(Decimal::ZERO);
        Ok(self.next(self.balance, frozen))
    }

    /// Converts a freeze into a debit.
    pub fn commit(&self, amount: Decimal) -> Result<Wallet, LedgerError> {
        ensure_positive(amount)?;
        if self.frozen < amount {
            return Err(LedgerError::InsufficientFrozen {
                requested: amount,
                frozen: self.frozen,
            });
        }
        Ok(self.next(self.balance - amount, self.frozen - amount))
    }

    pub fn credit(&self, amount: Decimal) -> Result<Wallet, LedgerError> {
        ensure_positive(amount)?;
        Ok(self.next(self.balance + amount, self.frozen))
    }

    /// Undoes a `commit` whose surrounding transition was lost.
    pub fn restore_commit(&self, amount: Decimal) -> Result<Wallet, LedgerError> {
        ensure_positive(amount)?;
        Ok(self.next(self.balance + amount, self.frozen + amount))
    }

    /// Undoes a `credit`; only unfrozen money can be taken back.
    pub fn reverse_credit(&self, amount: Decimal) -> Result<Wallet, LedgerError> {
        ensure_positive(amount)?;
        if amount > self.available() {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.available(),
            });
        }
        Ok(self.next(self.balance - amount, self.frozen))
    }

    fn next(&self, balance: Decimal, frozen: Decimal) -> Wallet {
        Wallet {
            user_id: self.user_id,
            balance,
            frozen,
            version: self.version + 1,
            updated_at: Utc::now(),
        }
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletView {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub frozen: Decimal,
    pub available_credit: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id,
            balance: wallet.balance,
            frozen: wallet.frozen,
            available_credit: wallet.available(),
            updated_at: wallet.updated_at,
        }
    }
}

// ==============================================================================
// TOP-UP MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopUpOrderRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTopUpRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Order as held by the payment gateway. Amounts are in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: serde_json::Value,
}

impl GatewayOrder {
    pub fn major_amount(&self) -> Decimal {
        Decimal::new(self.amount, 2)
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.notes
            .get("user_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// A verified gateway payment credited to a wallet. `order_id` is unique so
/// a payment can only be credited once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRecord {
    pub order_id: String,
    pub payment_id: String,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn wallet(balance: Decimal, frozen: Decimal) -> Wallet {
        Wallet {
            balance,
            frozen,
            ..Wallet::new(Uuid::new_v4())
        }
    }

    #[test]
    fn freeze_within_available() {
        let w = wallet(dec!(1000), dec!(0)).freeze(dec!(500)).unwrap();
        assert_eq!(w.frozen, dec!(500));
        assert_eq!(w.available(), dec!(500));
        assert_eq!(w.version, 1);
    }

    #[test]
    fn freeze_beyond_available_fails() {
        let w = wallet(dec!(1000), dec!(600));
        assert_matches!(
            w.freeze(dec!(600)),
            Err(LedgerError::InsufficientBalance { available, .. }) if available == dec!(400)
        );
    }

    #[test]
    fn unfreeze_clamps_to_zero() {
        let w = wallet(dec!(1000), dec!(200)).unfreeze(dec!(500)).unwrap();
        assert_eq!(w.frozen, dec!(0));
        assert_eq!(w.balance, dec!(1000));
    }

    #[test]
    fn commit_requires_frozen_cover() {
        let w = wallet(dec!(400), dec!(400));
        let committed = w.commit(dec!(400)).unwrap();
        assert_eq!(committed.balance, dec!(0));
        assert_eq!(committed.frozen, dec!(0));

        assert_matches!(
            wallet(dec!(1000), dec!(100)).commit(dec!(200)),
            Err(LedgerError::InsufficientFrozen { .. })
        );
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let w = wallet(dec!(10), dec!(0));
        assert_matches!(w.freeze(dec!(0)), Err(LedgerError::InvalidAmount(_)));
        assert_matches!(w.credit(dec!(-5)), Err(LedgerError::InvalidAmount(_)));
        assert_matches!(w.commit(dec!(0)), Err(LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn restore_commit_undoes_commit() {
        let original = wallet(dec!(700), dec!(300));
        let restored = original
            .commit(dec!(300))
            .and_then(|w| w.restore_commit(dec!(300)))
            .unwrap();
        assert_eq!(restored.balance, original.balance);
        assert_eq!(restored.frozen, original.frozen);
    }

    #[test]
    fn gateway_order_amount_in_major_units() {
        let order = GatewayOrder {
            id: "order_1".to_string(),
            amount: 40050,
            currency: "INR".to_string(),
            status: "paid".to_string(),
            receipt: None,
            notes: serde_json::json!({ "user_id": Uuid::nil().to_string() }),
        };
        assert_eq!(order.major_amount(), dec!(400.50));
        assert_eq!(order.owner(), Some(Uuid::nil()));
    }
}
