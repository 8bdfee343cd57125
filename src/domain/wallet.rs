//! Wallet entity
//!
//! A balance holder owned by exactly one user. Every mutation returns a new
//! Wallet value; nothing is persisted until the caller saves the result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{now, DomainError, Money};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wallet {
    /// Unique wallet ID (UUID string)
    id: String,

    /// Owner user ID
    user_id: i64,

    /// Current balance, never negative
    balance: Money,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a fresh zero-balance wallet for a user
    pub fn create(user_id: i64) -> Self {
        let now = now();

        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            balance: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a wallet from stored fields.
    /// Money already carries the non-negative invariant, so nothing else to check.
    pub fn reconstitute(
        id: String,
        user_id: i64,
        balance: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            balance,
            created_at,
            updated_at,
        }
    }

    /// New wallet value with `amount` added to the balance
    pub fn deposit(&self, amount: &Money) -> Wallet {
        Self {
            balance: self.balance.add(amount),
            updated_at: now(),
            ..self.clone()
        }
    }

    /// New wallet value with `amount` taken from the balance.
    ///
    /// # Errors
    /// - `DomainError::InsufficientFunds` if the balance is lower than `amount`
    pub fn withdraw(&self, amount: &Money) -> Result<Wallet, DomainError> {
        if !self.can_withdraw(amount) {
            return Err(DomainError::insufficient_funds(*amount, self.balance));
        }

        Ok(Self {
            balance: self.balance.subtract(amount)?,
            updated_at: now(),
            ..self.clone()
        })
    }

    pub fn can_withdraw(&self, amount: &Money) -> bool {
        self.balance.is_greater_than_or_equal(amount)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
