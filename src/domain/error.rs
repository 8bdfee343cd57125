//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::Money;

/// Business rule and invariant violations raised by the value/entity model.
///
/// Construction failures are never caught inside the domain; they abort
/// whatever atomic unit is in progress.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Negative money, or a subtraction that would go below zero
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Structural invariant of a transaction violated at construction
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Illegal status transition (complete/fail on a terminal state)
    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),

    /// Withdrawal exceeds the wallet balance
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Money, available: Money) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Malformed input the caller has to fix (as opposed to a business outcome)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidAmount(_) | Self::InvalidTransaction(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = DomainError::insufficient_funds(
            Money::from_cents(10_000).unwrap(),
            Money::from_cents(2_550).unwrap(),
        );

        assert!(!err.is_client_error());
        assert!(err.to_string().contains("R$ 100,00"));
        assert!(err.to_string().contains("R$ 25,50"));
    }

    #[test]
    fn test_client_errors() {
        assert!(DomainError::InvalidAmount("negative".into()).is_client_error());
        assert!(DomainError::InvalidTransaction("self transfer".into()).is_client_error());
        assert!(!DomainError::InvalidTransactionState("completed".into()).is_client_error());
    }
}
