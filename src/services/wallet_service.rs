//! Wallet Service
//!
//! Wallet lifecycle and balance changes that do not produce a transaction
//! record.

use crate::domain::{Money, Wallet};
use crate::error::{AppError, AppResult};
use crate::store::Session;

pub struct WalletService<'a, S: Session + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: Session + ?Sized> WalletService<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self { session }
    }

    /// Create the zero-balance wallet of a user.
    ///
    /// # Errors
    /// - `UserNotFound` if the user does not exist
    /// - `WalletAlreadyExists` if the user already owns a wallet
    pub async fn create_wallet_for_user(&mut self, user_id: i64) -> AppResult<Wallet> {
        if self.session.users().find_by_id(user_id).await?.is_none() {
            return Err(AppError::UserNotFound(user_id));
        }

        if self
            .session
            .wallets()
            .find_by_user_id(user_id)
            .await?
            .is_some()
        {
            return Err(AppError::WalletAlreadyExists(user_id));
        }

        let wallet = self.session.wallets().save(&Wallet::create(user_id)).await?;

        tracing::info!(wallet_id = %wallet.id(), user_id, "Wallet created");

        Ok(wallet)
    }

    pub async fn find_all(&mut self) -> AppResult<Vec<Wallet>> {
        Ok(self.session.wallets().find_all().await?)
    }

    /// `None` when no wallet has this id
    pub async fn find_by_id(&mut self, id: &str) -> AppResult<Option<Wallet>> {
        Ok(self.session.wallets().find_by_id(id).await?)
    }

    /// Credit a wallet directly: single save, no transaction record
    pub async fn deposit(&mut self, wallet_id: &str, amount: Money) -> AppResult<Wallet> {
        let wallet = self.load(wallet_id).await?;
        Ok(self.session.wallets().save(&wallet.deposit(&amount)).await?)
    }

    /// Debit a wallet directly: single save, no transaction record
    pub async fn withdraw(&mut self, wallet_id: &str, amount: Money) -> AppResult<Wallet> {
        let wallet = self.load(wallet_id).await?;
        let debited = wallet.withdraw(&amount)?;
        Ok(self.session.wallets().save(&debited).await?)
    }

    async fn load(&mut self, wallet_id: &str) -> AppResult<Wallet> {
        self.session
            .wallets()
            .find_by_id(wallet_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(wallet_id.to_string()))
    }
}
