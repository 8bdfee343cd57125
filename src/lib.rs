//! wallet-ledger Library
//!
//! Wallet balances and money movements (deposit, withdraw, transfer) with
//! atomic persistence and best-effort compensation for failed transfers.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod services;
pub mod store;
pub mod validation;

pub use config::{Config, LogFormat};
pub use domain::{DomainError, Money, Transaction, TransactionStatus, TransactionType, User, UserType, Wallet};
pub use error::{AppError, AppResult, ErrorResponse};
