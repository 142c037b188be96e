pub mod gateway;
pub mod ledger;

pub use gateway::PaymentGatewayClient;
pub use ledger::LedgerService;
