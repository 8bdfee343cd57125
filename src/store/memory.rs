//! In-memory Store
//!
//! Process-local backend with the same unit semantics as Postgres: writes in
//! an open unit are staged per session and only become visible on commit.
//! Faults can be injected to make particular saves fail.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{Transaction, TransactionStatus, User, Wallet};

use super::{
    RepositoryError, RepositoryResult, Session, Store, TransactionRepository, UserRepository,
    WalletRepository,
};

/// A save that should be rejected with [`RepositoryError::Unavailable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Saving the wallet with this id
    WalletSave(String),
    /// Saving any transaction in this status
    TransactionSave(TransactionStatus),
}

#[derive(Debug, Default, Clone)]
struct Tables {
    wallets: HashMap<String, Wallet>,
    transactions: HashMap<String, Transaction>,
    users: HashMap<i64, User>,
}

impl Tables {
    fn apply(&mut self, staged: Tables) {
        self.wallets.extend(staged.wallets);
        self.transactions.extend(staged.transactions);
        self.users.extend(staged.users);
    }
}

#[derive(Debug, Default)]
struct Shared {
    committed: Tables,
    last_user_id: i64,
    faults: Vec<Fault>,
}

/// Shared in-memory state; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete session, for callers that want to skip the trait object
    pub fn open(&self) -> MemorySession {
        MemorySession {
            shared: Arc::clone(&self.shared),
            staged: None,
        }
    }

    pub fn inject(&self, fault: Fault) {
        lock(&self.shared).faults.push(fault);
    }

    pub fn clear_faults(&self) {
        lock(&self.shared).faults.clear();
    }

    /// Committed state of a wallet
    pub fn wallet(&self, id: &str) -> Option<Wallet> {
        lock(&self.shared).committed.wallets.get(id).cloned()
    }

    /// Committed state of a transaction
    pub fn transaction(&self, id: &str) -> Option<Transaction> {
        lock(&self.shared).committed.transactions.get(id).cloned()
    }

    /// All committed transactions, oldest first
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = lock(&self.shared)
            .committed
            .transactions
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(b.id())));
        all
    }
}

impl Store for MemoryStore {
    fn session(&self) -> Box<dyn Session> {
        Box::new(self.open())
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // a panicking test must not wedge the other sessions
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Committed values overlaid with the ones staged in the open unit
fn merged<K, V>(committed: &HashMap<K, V>, staged: Option<&HashMap<K, V>>) -> Vec<V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut view = committed.clone();
    if let Some(staged) = staged {
        view.extend(staged.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    view.into_values().collect()
}

/// Session over a [`MemoryStore`]
pub struct MemorySession {
    shared: Arc<Mutex<Shared>>,
    staged: Option<Tables>,
}

impl MemorySession {
    fn check(&self, fault: Fault) -> RepositoryResult<()> {
        if lock(&self.shared).faults.contains(&fault) {
            return Err(RepositoryError::Unavailable(format!(
                "injected fault {:?}",
                fault
            )));
        }
        Ok(())
    }

    fn all_wallets(&self) -> Vec<Wallet> {
        let shared = lock(&self.shared);
        merged(
            &shared.committed.wallets,
            self.staged.as_ref().map(|t| &t.wallets),
        )
    }

    fn all_users(&self) -> Vec<User> {
        let shared = lock(&self.shared);
        merged(
            &shared.committed.users,
            self.staged.as_ref().map(|t| &t.users),
        )
    }

    fn save_wallet(&mut self, wallet: &Wallet) -> RepositoryResult<Wallet> {
        self.check(Fault::WalletSave(wallet.id().to_string()))?;

        let owner_taken = self
            .all_wallets()
            .iter()
            .any(|w| w.user_id() == wallet.user_id() && w.id() != wallet.id());
        if owner_taken {
            return Err(RepositoryError::Conflict(format!(
                "user {} already has a wallet",
                wallet.user_id()
            )));
        }

        match self.staged.as_mut() {
            Some(tables) => upsert_wallet(&mut tables.wallets, wallet),
            None => upsert_wallet(&mut lock(&self.shared).committed.wallets, wallet),
        }
        Ok(wallet.clone())
    }

    fn find_wallet(&self, id: &str) -> Option<Wallet> {
        if let Some(wallet) = self.staged.as_ref().and_then(|t| t.wallets.get(id)) {
            return Some(wallet.clone());
        }
        lock(&self.shared).committed.wallets.get(id).cloned()
    }

    fn save_transaction(&mut self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        self.check(Fault::TransactionSave(transaction.status()))?;

        let existing = self.find_transaction(transaction.id());
        let row = match existing {
            // only status and updated_at change on an existing row
            Some(existing) => Transaction::reconstitute(
                existing.id().to_string(),
                existing.transaction_type(),
                existing.from_wallet_id().map(String::from),
                existing.to_wallet_id().map(String::from),
                existing.amount(),
                existing.description().to_string(),
                transaction.status(),
                existing.created_at(),
                transaction.updated_at(),
            )?,
            None => transaction.clone(),
        };

        match self.staged.as_mut() {
            Some(tables) => {
                tables.transactions.insert(row.id().to_string(), row.clone());
            }
            None => {
                lock(&self.shared)
                    .committed
                    .transactions
                    .insert(row.id().to_string(), row.clone());
            }
        }
        Ok(row)
    }

    fn find_transaction(&self, id: &str) -> Option<Transaction> {
        if let Some(transaction) = self.staged.as_ref().and_then(|t| t.transactions.get(id)) {
            return Some(transaction.clone());
        }
        lock(&self.shared).committed.transactions.get(id).cloned()
    }

    fn save_user(&mut self, user: &User) -> RepositoryResult<User> {
        let email_taken = self
            .all_users()
            .iter()
            .any(|u| u.email() == user.email() && u.id() != user.id());
        if email_taken {
            return Err(RepositoryError::Conflict(format!(
                "email {} is already registered",
                user.email()
            )));
        }

        let user = if user.is_new() {
            // ids are never reused, even when the unit rolls back
            let mut shared = lock(&self.shared);
            shared.last_user_id += 1;
            user.with_id(shared.last_user_id)
        } else {
            user.clone()
        };

        match self.staged.as_mut() {
            Some(tables) => {
                tables.users.insert(user.id(), user.clone());
            }
            None => {
                lock(&self.shared).committed.users.insert(user.id(), user.clone());
            }
        }
        Ok(user)
    }

    fn find_user(&self, id: i64) -> Option<User> {
        if let Some(user) = self.staged.as_ref().and_then(|t| t.users.get(&id)) {
            return Some(user.clone());
        }
        lock(&self.shared).committed.users.get(&id).cloned()
    }
}

fn upsert_wallet(wallets: &mut HashMap<String, Wallet>, wallet: &Wallet) {
    let row = match wallets.get(wallet.id()) {
        // only balance and updated_at change on an existing row
        Some(existing) => Wallet::reconstitute(
            existing.id().to_string(),
            existing.user_id(),
            wallet.balance(),
            existing.created_at(),
            wallet.updated_at(),
        ),
        None => wallet.clone(),
    };
    wallets.insert(row.id().to_string(), row);
}

#[async_trait]
impl Session for MemorySession {
    fn wallets(&mut self) -> Box<dyn WalletRepository + '_> {
        Box::new(MemoryWallets { session: self })
    }

    fn transactions(&mut self) -> Box<dyn TransactionRepository + '_> {
        Box::new(MemoryTransactions { session: self })
    }

    fn users(&mut self) -> Box<dyn UserRepository + '_> {
        Box::new(MemoryUsers { session: self })
    }

    fn in_unit(&self) -> bool {
        self.staged.is_some()
    }

    async fn begin(&mut self) -> RepositoryResult<()> {
        if self.staged.is_some() {
            return Err(RepositoryError::UnitAlreadyOpen);
        }
        self.staged = Some(Tables::default());
        Ok(())
    }

    async fn commit(&mut self) -> RepositoryResult<()> {
        let staged = self.staged.take().ok_or(RepositoryError::NoOpenUnit)?;
        lock(&self.shared).committed.apply(staged);
        Ok(())
    }

    async fn rollback(&mut self) -> RepositoryResult<()> {
        self.staged.take().ok_or(RepositoryError::NoOpenUnit)?;
        Ok(())
    }
}

struct MemoryWallets<'a> {
    session: &'a mut MemorySession,
}

#[async_trait]
impl<'a> WalletRepository for MemoryWallets<'a> {
    async fn save(&mut self, wallet: &Wallet) -> RepositoryResult<Wallet> {
        self.session.save_wallet(wallet)
    }

    async fn find_by_id(&mut self, id: &str) -> RepositoryResult<Option<Wallet>> {
        Ok(self.session.find_wallet(id))
    }

    async fn find_by_user_id(&mut self, user_id: i64) -> RepositoryResult<Option<Wallet>> {
        Ok(self
            .session
            .all_wallets()
            .into_iter()
            .find(|w| w.user_id() == user_id))
    }

    async fn find_all(&mut self) -> RepositoryResult<Vec<Wallet>> {
        let mut wallets = self.session.all_wallets();
        wallets.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(b.id())));
        Ok(wallets)
    }
}

struct MemoryTransactions<'a> {
    session: &'a mut MemorySession,
}

#[async_trait]
impl<'a> TransactionRepository for MemoryTransactions<'a> {
    async fn save(&mut self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        self.session.save_transaction(transaction)
    }

    async fn find_by_id(&mut self, id: &str) -> RepositoryResult<Option<Transaction>> {
        Ok(self.session.find_transaction(id))
    }
}

struct MemoryUsers<'a> {
    session: &'a mut MemorySession,
}

#[async_trait]
impl<'a> UserRepository for MemoryUsers<'a> {
    async fn save(&mut self, user: &User) -> RepositoryResult<User> {
        self.session.save_user(user)
    }

    async fn find_by_id(&mut self, id: i64) -> RepositoryResult<Option<User>> {
        Ok(self.session.find_user(id))
    }

    async fn find_by_email(&mut self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .session
            .all_users()
            .into_iter()
            .find(|u| u.email() == email))
    }
}
