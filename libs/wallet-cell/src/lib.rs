pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::LedgerError;
pub use models::*;
pub use services::{LedgerService, PaymentGatewayClient};
pub use store::{MemoryWalletStore, SupabaseWalletStore, WalletStore};
