use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Decimal, available: Decimal },

    #[error("Insufficient frozen funds: requested {requested}, frozen {frozen}")]
    InsufficientFrozen { requested: Decimal, frozen: Decimal },

    #[error("Wallet not found for user {0}")]
    WalletNotFound(Uuid),

    #[error("Wallet {0} is under contention, retries exhausted")]
    Contention(Uuid),

    #[error("Payment already credited for order {0}")]
    AlreadyCredited(String),

    #[error("Payment signature verification failed")]
    SignatureMismatch,

    #[error("Payment gateway not configured")]
    GatewayNotConfigured,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn action(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid-amount",
            LedgerError::InsufficientBalance { .. } => "insufficient-balance",
            LedgerError::InsufficientFrozen { .. } => "insufficient-frozen",
            LedgerError::WalletNotFound(_) => "wallet-not-found",
            LedgerError::Contention(_) => "wallet-contention",
            LedgerError::AlreadyCredited(_) => "payment-already-credited",
            LedgerError::SignatureMismatch => "payment-signature-mismatch",
            LedgerError::GatewayNotConfigured | LedgerError::Gateway(_) => "payment-gateway-error",
            LedgerError::Storage(_) => "storage-error",
        }
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        let action = e.action();
        match e {
            LedgerError::InvalidAmount(_) => AppError::ValidationError(action, e.to_string()),
            LedgerError::WalletNotFound(_) => AppError::NotFound(action, e.to_string()),
            LedgerError::InsufficientBalance { .. }
            | LedgerError::InsufficientFrozen { .. }
            | LedgerError::Contention(_)
            | LedgerError::AlreadyCredited(_) => AppError::Conflict(action, e.to_string()),
            LedgerError::SignatureMismatch => AppError::ValidationError(action, e.to_string()),
            LedgerError::GatewayNotConfigured | LedgerError::Gateway(_) => {
                AppError::ExternalService(action, e.to_string())
            }
            LedgerError::Storage(msg) => AppError::Database(msg),
        }
    }
}
