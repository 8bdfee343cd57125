//! Store module
//!
//! Persistence boundary. Services only see the repository contracts and the
//! [`Session`] that owns an atomic unit; Postgres and in-memory backends
//! implement them.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Transaction, User, Wallet};

pub use error::{RepositoryError, RepositoryResult};
pub use memory::{Fault, MemorySession, MemoryStore};
pub use postgres::{PgSession, PgStore};

/// Wallet persistence contract
#[async_trait]
pub trait WalletRepository: Send {
    /// Upsert: insert when no row has this id, update balance otherwise
    async fn save(&mut self, wallet: &Wallet) -> RepositoryResult<Wallet>;

    async fn find_by_id(&mut self, id: &str) -> RepositoryResult<Option<Wallet>>;

    async fn find_by_user_id(&mut self, user_id: i64) -> RepositoryResult<Option<Wallet>>;

    /// All wallets, oldest first
    async fn find_all(&mut self) -> RepositoryResult<Vec<Wallet>>;
}

/// Transaction persistence contract
#[async_trait]
pub trait TransactionRepository: Send {
    /// Upsert: insert when no row has this id, update status otherwise
    async fn save(&mut self, transaction: &Transaction) -> RepositoryResult<Transaction>;

    async fn find_by_id(&mut self, id: &str) -> RepositoryResult<Option<Transaction>>;
}

/// User persistence contract
#[async_trait]
pub trait UserRepository: Send {
    /// Insert when the user is new (id 0), returning it with the assigned id
    async fn save(&mut self, user: &User) -> RepositoryResult<User>;

    async fn find_by_id(&mut self, id: i64) -> RepositoryResult<Option<User>>;

    async fn find_by_email(&mut self, email: &str) -> RepositoryResult<Option<User>>;
}

/// One connection's worth of work.
///
/// While a unit is open every repository call runs inside it and nothing is
/// visible to other sessions until `commit`. A session is owned by one task
/// and never shared.
#[async_trait]
pub trait Session: Send {
    fn wallets(&mut self) -> Box<dyn WalletRepository + '_>;

    fn transactions(&mut self) -> Box<dyn TransactionRepository + '_>;

    fn users(&mut self) -> Box<dyn UserRepository + '_>;

    /// Whether an atomic unit is currently open
    fn in_unit(&self) -> bool;

    async fn begin(&mut self) -> RepositoryResult<()>;

    async fn commit(&mut self) -> RepositoryResult<()>;

    async fn rollback(&mut self) -> RepositoryResult<()>;
}

/// Factory for sessions, shared by the HTTP layer
pub trait Store: Send + Sync {
    fn session(&self) -> Box<dyn Session>;
}
