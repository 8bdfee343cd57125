//! Services module
//!
//! Orchestration over the store: each service borrows one session for the
//! duration of a request and runs its writes inside an atomic unit.

mod transaction_service;
mod unit;
mod user_service;
mod wallet_service;


pub use transaction_service::{CompensationOutcome, TransactionService, TransferFailure};
pub use unit::Unit;
pub use user_service::{Registration, UserService, REGISTRATION_RULES};
pub use wallet_service::WalletService;
