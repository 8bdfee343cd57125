//! Domain module
//!
//! Immutable value and entity model: every transition returns a new value.

pub mod error;
pub mod money;
pub mod transaction;
pub mod user;
pub mod wallet;

use chrono::{DateTime, SubsecRound, Utc};

pub use error::DomainError;
pub use money::Money;
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use user::{User, UserType};
pub use wallet::Wallet;

/// Current time at the precision the database keeps (microseconds),
/// so stored entities reload equal by value.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
