//! Postgres Store
//!
//! sqlx-backed repositories. Outside a unit each statement autocommits on the
//! pool; inside a unit every statement runs on the session's open transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction as DbTransaction};

use crate::domain::{Money, Transaction, TransactionStatus, TransactionType, User, UserType, Wallet};

use super::{
    RepositoryError, RepositoryResult, Session, Store, TransactionRepository, UserRepository,
    WalletRepository,
};

/// Run a query on the open transaction if there is one, on the pool otherwise
macro_rules! on_session {
    ($session:expr, $query:expr, $method:ident) => {
        match $session.tx.as_mut() {
            Some(tx) => $query.$method(&mut **tx).await,
            None => $query.$method(&$session.pool).await,
        }
    };
}

type WalletRow = (String, i64, i64, DateTime<Utc>, DateTime<Utc>);

type TransactionRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    i64,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

type UserRow = (i64, String, String, String, String, DateTime<Utc>);

const WALLET_COLUMNS: &str = "id, user_id, balance, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, type, from_wallet_id, to_wallet_id, amount, description, status, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, user_type, created_at";

// =========================================================================
// Store / Session
// =========================================================================

/// Hands out one [`PgSession`] per request over a shared pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Store for PgStore {
    fn session(&self) -> Box<dyn Session> {
        Box::new(PgSession::new(self.pool.clone()))
    }
}

/// A pool handle plus the transaction of the currently open unit.
///
/// Dropping a session with an open unit rolls it back.
pub struct PgSession {
    pool: PgPool,
    tx: Option<DbTransaction<'static, Postgres>>,
}

impl PgSession {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }
}

#[async_trait]
impl Session for PgSession {
    fn wallets(&mut self) -> Box<dyn WalletRepository + '_> {
        Box::new(PgWallets { session: self })
    }

    fn transactions(&mut self) -> Box<dyn TransactionRepository + '_> {
        Box::new(PgTransactions { session: self })
    }

    fn users(&mut self) -> Box<dyn UserRepository + '_> {
        Box::new(PgUsers { session: self })
    }

    fn in_unit(&self) -> bool {
        self.tx.is_some()
    }

    async fn begin(&mut self) -> RepositoryResult<()> {
        if self.tx.is_some() {
            return Err(RepositoryError::UnitAlreadyOpen);
        }

        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> RepositoryResult<()> {
        let tx = self.tx.take().ok_or(RepositoryError::NoOpenUnit)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> RepositoryResult<()> {
        let tx = self.tx.take().ok_or(RepositoryError::NoOpenUnit)?;
        tx.rollback().await?;
        Ok(())
    }
}

// =========================================================================
// Wallets
// =========================================================================

struct PgWallets<'a> {
    session: &'a mut PgSession,
}

#[async_trait]
impl<'a> WalletRepository for PgWallets<'a> {
    async fn save(&mut self, wallet: &Wallet) -> RepositoryResult<Wallet> {
        let query = sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET balance = EXCLUDED.balance, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(wallet.id())
        .bind(wallet.user_id())
        .bind(wallet.balance().to_cents())
        .bind(wallet.created_at())
        .bind(wallet.updated_at());

        on_session!(self.session, query, execute)?;

        Ok(wallet.clone())
    }

    async fn find_by_id(&mut self, id: &str) -> RepositoryResult<Option<Wallet>> {
        let sql = format!("SELECT {} FROM wallets WHERE id = $1", WALLET_COLUMNS);
        let query = sqlx::query_as::<_, WalletRow>(&sql).bind(id);

        on_session!(self.session, query, fetch_optional)?
            .map(wallet_from_row)
            .transpose()
    }

    async fn find_by_user_id(&mut self, user_id: i64) -> RepositoryResult<Option<Wallet>> {
        let sql = format!("SELECT {} FROM wallets WHERE user_id = $1", WALLET_COLUMNS);
        let query = sqlx::query_as::<_, WalletRow>(&sql).bind(user_id);

        on_session!(self.session, query, fetch_optional)?
            .map(wallet_from_row)
            .transpose()
    }

    async fn find_all(&mut self) -> RepositoryResult<Vec<Wallet>> {
        let sql = format!(
            "SELECT {} FROM wallets ORDER BY created_at, id",
            WALLET_COLUMNS
        );
        let query = sqlx::query_as::<_, WalletRow>(&sql);

        on_session!(self.session, query, fetch_all)?
            .into_iter()
            .map(wallet_from_row)
            .collect()
    }
}

fn wallet_from_row(row: WalletRow) -> RepositoryResult<Wallet> {
    let (id, user_id, balance, created_at, updated_at) = row;

    Ok(Wallet::reconstitute(
        id,
        user_id,
        Money::from_cents(balance)?,
        created_at,
        updated_at,
    ))
}

// =========================================================================
// Transactions
// =========================================================================

struct PgTransactions<'a> {
    session: &'a mut PgSession,
}

#[async_trait]
impl<'a> TransactionRepository for PgTransactions<'a> {
    async fn save(&mut self, transaction: &Transaction) -> RepositoryResult<Transaction> {
        let query = sqlx::query(
            r#"
            INSERT INTO transactions
                (id, type, from_wallet_id, to_wallet_id, amount, description, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(transaction.id())
        .bind(transaction.transaction_type().as_str())
        .bind(transaction.from_wallet_id())
        .bind(transaction.to_wallet_id())
        .bind(transaction.amount().to_cents())
        .bind(transaction.description())
        .bind(transaction.status().as_str())
        .bind(transaction.created_at())
        .bind(transaction.updated_at());

        on_session!(self.session, query, execute)?;

        Ok(transaction.clone())
    }

    async fn find_by_id(&mut self, id: &str) -> RepositoryResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        );
        let query = sqlx::query_as::<_, TransactionRow>(&sql).bind(id);

        on_session!(self.session, query, fetch_optional)?
            .map(transaction_from_row)
            .transpose()
    }
}

fn transaction_from_row(row: TransactionRow) -> RepositoryResult<Transaction> {
    let (id, kind, from_wallet_id, to_wallet_id, amount, description, status, created_at, updated_at) =
        row;

    let transaction_type = kind.parse::<TransactionType>().map_err(|_| {
        RepositoryError::Corrupt(format!("transaction {} has unknown type '{}'", id, kind))
    })?;
    let status = status.parse::<TransactionStatus>().map_err(|_| {
        RepositoryError::Corrupt(format!("transaction {} has unknown status '{}'", id, status))
    })?;

    Ok(Transaction::reconstitute(
        id,
        transaction_type,
        from_wallet_id,
        to_wallet_id,
        Money::from_cents(amount)?,
        description,
        status,
        created_at,
        updated_at,
    )?)
}

// =========================================================================
// Users
// =========================================================================

struct PgUsers<'a> {
    session: &'a mut PgSession,
}

#[async_trait]
impl<'a> UserRepository for PgUsers<'a> {
    async fn save(&mut self, user: &User) -> RepositoryResult<User> {
        if user.is_new() {
            let query = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO users (name, email, password_hash, user_type, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(user.name())
            .bind(user.email())
            .bind(user.password_hash())
            .bind(user.user_type().as_str())
            .bind(user.created_at());

            let id = on_session!(self.session, query, fetch_one)?;
            return Ok(user.with_id(id));
        }

        let query = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, user_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                user_type = EXCLUDED.user_type
            "#,
        )
        .bind(user.id())
        .bind(user.name())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.user_type().as_str())
        .bind(user.created_at());

        on_session!(self.session, query, execute)?;

        Ok(user.clone())
    }

    async fn find_by_id(&mut self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let query = sqlx::query_as::<_, UserRow>(&sql).bind(id);

        on_session!(self.session, query, fetch_optional)?
            .map(user_from_row)
            .transpose()
    }

    async fn find_by_email(&mut self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let query = sqlx::query_as::<_, UserRow>(&sql).bind(email);

        on_session!(self.session, query, fetch_optional)?
            .map(user_from_row)
            .transpose()
    }
}

fn user_from_row(row: UserRow) -> RepositoryResult<User> {
    let (id, name, email, password_hash, user_type, created_at) = row;

    let user_type = user_type.parse::<UserType>().map_err(|_| {
        RepositoryError::Corrupt(format!("user {} has unknown type '{}'", id, user_type))
    })?;

    Ok(User::reconstitute(id, name, email, password_hash, user_type, created_at))
}
