//! Atomic unit helper
//!
//! A service operation that must be atomic calls [`Unit::enter`] before its
//! first write and [`Unit::finish`] with the outcome. Only the call that
//! actually opened the unit commits or rolls it back, so a service invoked
//! from inside another service's unit joins it instead of nesting.

use crate::error::AppResult;
use crate::store::Session;

/// Ticket returned by [`Unit::enter`]
#[must_use = "a unit has to be finished"]
#[derive(Debug)]
pub struct Unit {
    owned: bool,
}

impl Unit {
    /// Open a unit on the session unless one is already open
    pub async fn enter<S: Session + ?Sized>(session: &mut S) -> AppResult<Unit> {
        if session.in_unit() {
            return Ok(Unit { owned: false });
        }

        session.begin().await?;
        Ok(Unit { owned: true })
    }

    /// Whether this ticket opened the unit
    pub fn is_owner(&self) -> bool {
        self.owned
    }

    /// Commit on success, roll back on failure; a joined unit is left alone.
    ///
    /// A failed rollback is logged and the original error is returned.
    pub async fn finish<S, T>(self, session: &mut S, result: AppResult<T>) -> AppResult<T>
    where
        S: Session + ?Sized,
    {
        if !self.owned {
            return result;
        }

        match result {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        cause = %err,
                        "Rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Wallet;
    use crate::error::AppError;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_owner_commits() {
        let store = MemoryStore::new();
        let mut session = store.open();
        let wallet = Wallet::create(1);

        let unit = Unit::enter(&mut session).await.unwrap();
        assert!(unit.is_owner());
        let result = session.wallets().save(&wallet).await.map_err(AppError::from);
        unit.finish(&mut session, result).await.unwrap();

        assert!(!session.in_unit());
        assert!(store.wallet(wallet.id()).is_some());
    }

    #[tokio::test]
    async fn test_owner_rolls_back_and_keeps_cause() {
        let store = MemoryStore::new();
        let mut session = store.open();
        let wallet = Wallet::create(1);

        let unit = Unit::enter(&mut session).await.unwrap();
        session.wallets().save(&wallet).await.unwrap();
        let result: AppResult<()> = Err(AppError::WalletNotFound("x".into()));
        let err = unit.finish(&mut session, result).await.unwrap_err();

        assert!(matches!(err, AppError::WalletNotFound(_)));
        assert!(!session.in_unit());
        assert!(store.wallet(wallet.id()).is_none());
    }

    #[tokio::test]
    async fn test_joined_unit_is_left_to_the_owner() {
        let store = MemoryStore::new();
        let mut session = store.open();
        let wallet = Wallet::create(1);

        let outer = Unit::enter(&mut session).await.unwrap();
        let inner = Unit::enter(&mut session).await.unwrap();
        assert!(!inner.is_owner());

        let saved = session.wallets().save(&wallet).await.map_err(AppError::from);
        inner.finish(&mut session, saved).await.unwrap();
        // still open, nothing visible yet
        assert!(session.in_unit());
        assert!(store.wallet(wallet.id()).is_none());

        let failed: AppResult<()> = Err(AppError::Internal("outer failed".into()));
        assert!(outer.finish(&mut session, failed).await.is_err());
        assert!(store.wallet(wallet.id()).is_none());
    }
}
