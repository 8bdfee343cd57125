//! Transaction entity
//!
//! Records one monetary movement. Structural invariants are checked on every
//! construction path, including hydration from storage. Status only moves
//! through `complete` and `fail`, each returning a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{now, DomainError, Money};

/// Kind of monetary movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAW" => Ok(TransactionType::Withdraw),
            "TRANSFER" => Ok(TransactionType::Transfer),
            other => Err(DomainError::InvalidTransaction(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// Transaction status
///
/// PENDING -> COMPLETED | FAILED. COMPLETED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "COMPLETED" => Ok(TransactionStatus::Completed),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(DomainError::InvalidTransaction(format!(
                "unknown transaction status '{}'",
                other
            ))),
        }
    }
}

/// Transaction entity
///
/// References wallets by id only; it never owns a Wallet.
/// Serialize only: deserializing would skip the invariant checks, go through
/// [`Transaction::reconstitute`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    id: String,
    transaction_type: TransactionType,
    from_wallet_id: Option<String>,
    to_wallet_id: Option<String>,
    amount: Money,
    description: String,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Single constructor every path goes through
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        transaction_type: TransactionType,
        from_wallet_id: Option<String>,
        to_wallet_id: Option<String>,
        amount: Money,
        description: String,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let transaction = Self {
            id,
            transaction_type,
            from_wallet_id,
            to_wallet_id,
            amount,
            description,
            status,
            created_at,
            updated_at,
        };
        transaction.validate()?;
        Ok(transaction)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if !self.amount.is_positive() {
            return Err(DomainError::InvalidTransaction(
                "transaction amount must be positive".to_string(),
            ));
        }

        match self.transaction_type {
            TransactionType::Deposit => {
                if self.to_wallet_id.is_none() {
                    return Err(DomainError::InvalidTransaction(
                        "deposit must have a destination wallet".to_string(),
                    ));
                }
                if self.from_wallet_id.is_some() {
                    return Err(DomainError::InvalidTransaction(
                        "deposit cannot have a source wallet".to_string(),
                    ));
                }
            }
            TransactionType::Withdraw => {
                if self.from_wallet_id.is_none() {
                    return Err(DomainError::InvalidTransaction(
                        "withdrawal must have a source wallet".to_string(),
                    ));
                }
                if self.to_wallet_id.is_some() {
                    return Err(DomainError::InvalidTransaction(
                        "withdrawal cannot have a destination wallet".to_string(),
                    ));
                }
            }
            TransactionType::Transfer => match (&self.from_wallet_id, &self.to_wallet_id) {
                (Some(from), Some(to)) if from == to => {
                    return Err(DomainError::InvalidTransaction(
                        "cannot transfer to the same wallet".to_string(),
                    ));
                }
                (Some(_), Some(_)) => {}
                _ => {
                    return Err(DomainError::InvalidTransaction(
                        "transfer must have both source and destination wallets".to_string(),
                    ));
                }
            },
        }

        Ok(())
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// Deposit into `to_wallet_id`; final (COMPLETED) at creation
    pub fn create_deposit(
        to_wallet_id: &str,
        amount: Money,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let now = now();
        Self::new(
            Uuid::new_v4().to_string(),
            TransactionType::Deposit,
            None,
            Some(to_wallet_id.to_string()),
            amount,
            description.into(),
            TransactionStatus::Completed,
            now,
            now,
        )
    }

    /// Withdrawal from `from_wallet_id`; final (COMPLETED) at creation
    pub fn create_withdrawal(
        from_wallet_id: &str,
        amount: Money,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let now = now();
        Self::new(
            Uuid::new_v4().to_string(),
            TransactionType::Withdraw,
            Some(from_wallet_id.to_string()),
            None,
            amount,
            description.into(),
            TransactionStatus::Completed,
            now,
            now,
        )
    }

    /// Transfer between two distinct wallets; starts PENDING
    pub fn create_transfer(
        from_wallet_id: &str,
        to_wallet_id: &str,
        amount: Money,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let now = now();
        Self::new(
            Uuid::new_v4().to_string(),
            TransactionType::Transfer,
            Some(from_wallet_id.to_string()),
            Some(to_wallet_id.to_string()),
            amount,
            description.into(),
            TransactionStatus::Pending,
            now,
            now,
        )
    }

    /// Rebuild a transaction from stored fields, re-checking the structural invariants
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: String,
        transaction_type: TransactionType,
        from_wallet_id: Option<String>,
        to_wallet_id: Option<String>,
        amount: Money,
        description: String,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::new(
            id,
            transaction_type,
            from_wallet_id,
            to_wallet_id,
            amount,
            description,
            status,
            created_at,
            updated_at,
        )
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// PENDING -> COMPLETED
    pub fn complete(&self) -> Result<Transaction, DomainError> {
        match self.status {
            TransactionStatus::Completed => Err(DomainError::InvalidTransactionState(
                "transaction is already completed".to_string(),
            )),
            TransactionStatus::Failed => Err(DomainError::InvalidTransactionState(
                "cannot complete a failed transaction".to_string(),
            )),
            TransactionStatus::Pending => Ok(self.with_status(TransactionStatus::Completed)),
        }
    }

    /// Any non-COMPLETED state -> FAILED
    pub fn fail(&self) -> Result<Transaction, DomainError> {
        if self.status == TransactionStatus::Completed {
            return Err(DomainError::InvalidTransactionState(
                "cannot fail a completed transaction".to_string(),
            ));
        }

        Ok(self.with_status(TransactionStatus::Failed))
    }

    fn with_status(&self, status: TransactionStatus) -> Transaction {
        Self {
            status,
            updated_at: now(),
            ..self.clone()
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn from_wallet_id(&self) -> Option<&str> {
        self.from_wallet_id.as_deref()
    }

    pub fn to_wallet_id(&self) -> Option<&str> {
        self.to_wallet_id.as_deref()
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(value: i64) -> Money {
        Money::from_cents(value).unwrap()
    }

    fn assert_invalid(result: Result<Transaction, DomainError>) {
        match result {
            Err(DomainError::InvalidTransaction(_)) => {}
            other => panic!("Expected InvalidTransaction, got: {:?}", other),
        }
    }

    fn assert_invalid_state(result: Result<Transaction, DomainError>) {
        match result {
            Err(DomainError::InvalidTransactionState(_)) => {}
            other => panic!("Expected InvalidTransactionState, got: {:?}", other),
        }
    }

    #[test]
    fn test_create_deposit() {
        let tx = Transaction::create_deposit("wallet-b", cents(10_000), "Salary").unwrap();

        assert_eq!(tx.transaction_type(), TransactionType::Deposit);
        assert_eq!(tx.status(), TransactionStatus::Completed);
        assert_eq!(tx.from_wallet_id(), None);
        assert_eq!(tx.to_wallet_id(), Some("wallet-b"));
        assert_eq!(tx.amount().to_cents(), 10_000);
        assert_eq!(tx.description(), "Salary");
        assert!(Uuid::parse_str(tx.id()).is_ok());
    }

    #[test]
    fn test_create_withdrawal() {
        let tx = Transaction::create_withdrawal("wallet-a", cents(500), "ATM").unwrap();

        assert_eq!(tx.transaction_type(), TransactionType::Withdraw);
        assert!(tx.is_completed());
        assert_eq!(tx.from_wallet_id(), Some("wallet-a"));
        assert_eq!(tx.to_wallet_id(), None);
    }

    #[test]
    fn test_create_transfer_starts_pending() {
        let tx = Transaction::create_transfer("wallet-a", "wallet-b", cents(5_000), "Rent").unwrap();

        assert_eq!(tx.transaction_type(), TransactionType::Transfer);
        assert!(tx.is_pending());
        assert_eq!(tx.from_wallet_id(), Some("wallet-a"));
        assert_eq!(tx.to_wallet_id(), Some("wallet-b"));
    }

    #[test]
    fn test_zero_amount_rejected_for_every_type() {
        assert_invalid(Transaction::create_deposit("b", Money::zero(), "x"));
        assert_invalid(Transaction::create_withdrawal("a", Money::zero(), "x"));
        assert_invalid(Transaction::create_transfer("a", "b", Money::zero(), "x"));
    }

    #[test]
    fn test_self_transfer_rejected() {
        for amount in [1, 100, 1_000_000] {
            assert_invalid(Transaction::create_transfer("same", "same", cents(amount), "x"));
        }
    }

    #[test]
    fn test_reconstitute_checks_wallet_references() {
        let now = Utc::now();
        let rebuild = |kind, from: Option<&str>, to: Option<&str>| {
            Transaction::reconstitute(
                "tx-1".to_string(),
                kind,
                from.map(String::from),
                to.map(String::from),
                cents(100),
                "stored".to_string(),
                TransactionStatus::Completed,
                now,
                now,
            )
        };

        assert_invalid(rebuild(TransactionType::Deposit, None, None));
        assert_invalid(rebuild(TransactionType::Deposit, Some("a"), Some("b")));
        assert_invalid(rebuild(TransactionType::Withdraw, None, None));
        assert_invalid(rebuild(TransactionType::Withdraw, Some("a"), Some("b")));
        assert_invalid(rebuild(TransactionType::Transfer, Some("a"), None));
        assert_invalid(rebuild(TransactionType::Transfer, Some("a"), Some("a")));

        assert!(rebuild(TransactionType::Deposit, None, Some("b")).is_ok());
        assert!(rebuild(TransactionType::Withdraw, Some("a"), None).is_ok());
        assert!(rebuild(TransactionType::Transfer, Some("a"), Some("b")).is_ok());
    }

    #[test]
    fn test_complete_pending_transfer() {
        let pending = Transaction::create_transfer("a", "b", cents(100), "x").unwrap();

        let completed = pending.complete().unwrap();

        assert!(completed.is_completed());
        assert_eq!(completed.id(), pending.id());
        assert_eq!(completed.created_at(), pending.created_at());
        assert!(completed.updated_at() >= pending.updated_at());
        assert!(pending.is_pending());
    }

    #[test]
    fn test_complete_twice_refused() {
        let completed = Transaction::create_transfer("a", "b", cents(100), "x")
            .unwrap()
            .complete()
            .unwrap();

        assert_invalid_state(completed.complete());
    }

    #[test]
    fn test_fail_after_complete_refused() {
        let deposit = Transaction::create_deposit("b", cents(100), "x").unwrap();
        assert_invalid_state(deposit.fail());

        let transfer = Transaction::create_transfer("a", "b", cents(100), "x")
            .unwrap()
            .complete()
            .unwrap();
        assert_invalid_state(transfer.fail());
    }

    #[test]
    fn test_fail_pending_then_complete_refused() {
        let failed = Transaction::create_transfer("a", "b", cents(100), "x")
            .unwrap()
            .fail()
            .unwrap();

        assert!(failed.is_failed());
        assert_invalid_state(failed.complete());
        // FAILED is not COMPLETED, so failing again is allowed
        assert!(failed.fail().unwrap().is_failed());
    }

    #[test]
    fn test_type_and_status_parse() {
        assert_eq!("WITHDRAW".parse::<TransactionType>().unwrap(), TransactionType::Withdraw);
        assert_eq!("FAILED".parse::<TransactionStatus>().unwrap(), TransactionStatus::Failed);
        assert!("withdraw".parse::<TransactionType>().is_err());
        assert!("DONE".parse::<TransactionStatus>().is_err());
        assert_eq!(TransactionStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn test_serde_uses_uppercase_names() {
        assert_eq!(serde_json::to_string(&TransactionType::Deposit).unwrap(), "\"DEPOSIT\"");
        assert_eq!(serde_json::to_string(&TransactionStatus::Completed).unwrap(), "\"COMPLETED\"");
    }
}
