//! Transaction Service
//!
//! Deposits, withdrawals and transfers. Every operation validates the
//! wallets first, then applies all of its writes inside one atomic unit.

use crate::domain::{Money, Transaction, Wallet};
use crate::error::{AppError, AppResult};
use crate::store::Session;

use super::Unit;

/// What happened to the transfer record after a failed transfer
#[derive(Debug)]
pub enum CompensationOutcome {
    /// The failure happened before a transfer record existed
    NotAttempted,
    /// The record was stored as FAILED
    MarkedFailed(Transaction),
    /// Recording the failure itself failed; details are in the logs
    CompensationFailed(String),
}

/// A failed transfer: the original cause plus the compensation result
#[derive(Debug)]
pub struct TransferFailure {
    pub cause: AppError,
    pub compensation: CompensationOutcome,
}

impl TransferFailure {
    fn uncompensated(cause: AppError) -> Self {
        Self {
            cause,
            compensation: CompensationOutcome::NotAttempted,
        }
    }
}

impl From<TransferFailure> for AppError {
    fn from(failure: TransferFailure) -> Self {
        failure.cause
    }
}

/// Orchestrator for money movements over one session
pub struct TransactionService<'a, S: Session + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: Session + ?Sized> TransactionService<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self { session }
    }

    // =========================================================================
    // Deposit
    // =========================================================================

    /// Credit a wallet and record a COMPLETED deposit.
    ///
    /// # Errors
    /// - `WalletNotFound` if the wallet does not exist (nothing is written)
    /// - `Domain(InvalidAmount)` if the amount is not positive (unit rolled back)
    pub async fn deposit(
        &mut self,
        wallet_id: &str,
        amount: Money,
        description: &str,
    ) -> AppResult<Transaction> {
        let wallet = self
            .session
            .wallets()
            .find_by_id(wallet_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(wallet_id.to_string()))?;

        let unit = Unit::enter(&mut *self.session).await?;
        let result = self.apply_deposit(&wallet, amount, description).await;
        let transaction = unit.finish(&mut *self.session, result).await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            wallet_id = %wallet_id,
            amount_cents = amount.to_cents(),
            "Deposit completed"
        );

        Ok(transaction)
    }

    async fn apply_deposit(
        &mut self,
        wallet: &Wallet,
        amount: Money,
        description: &str,
    ) -> AppResult<Transaction> {
        self.session.wallets().save(&wallet.deposit(&amount)).await?;

        let transaction = Transaction::create_deposit(wallet.id(), amount, description)?;
        Ok(self.session.transactions().save(&transaction).await?)
    }

    // =========================================================================
    // Withdraw
    // =========================================================================

    /// Debit a wallet and record a COMPLETED withdrawal.
    ///
    /// # Errors
    /// - `WalletNotFound` if the wallet does not exist
    /// - `Domain(InsufficientFunds)` if the balance is lower than `amount`
    pub async fn withdraw(
        &mut self,
        wallet_id: &str,
        amount: Money,
        description: &str,
    ) -> AppResult<Transaction> {
        let wallet = self
            .session
            .wallets()
            .find_by_id(wallet_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(wallet_id.to_string()))?;

        let unit = Unit::enter(&mut *self.session).await?;
        let result = self.apply_withdrawal(&wallet, amount, description).await;
        let transaction = unit.finish(&mut *self.session, result).await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            wallet_id = %wallet_id,
            amount_cents = amount.to_cents(),
            "Withdrawal completed"
        );

        Ok(transaction)
    }

    async fn apply_withdrawal(
        &mut self,
        wallet: &Wallet,
        amount: Money,
        description: &str,
    ) -> AppResult<Transaction> {
        let debited = wallet.withdraw(&amount)?;
        self.session.wallets().save(&debited).await?;

        let transaction = Transaction::create_withdrawal(wallet.id(), amount, description)?;
        Ok(self.session.transactions().save(&transaction).await?)
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    /// Move `amount` between two wallets. See [`Self::transfer_with_outcome`].
    pub async fn transfer(
        &mut self,
        from_wallet_id: &str,
        to_wallet_id: &str,
        amount: Money,
        description: &str,
    ) -> AppResult<Transaction> {
        Ok(self
            .transfer_with_outcome(from_wallet_id, to_wallet_id, amount, description)
            .await?)
    }

    /// Move `amount` between two wallets and return the COMPLETED transfer.
    ///
    /// Inside one unit: the PENDING record is saved, the source debited, the
    /// destination credited and the record completed. If any step fails the
    /// unit is rolled back and, when the record had been built, a FAILED copy
    /// is stored outside the unit on a best-effort basis.
    ///
    /// # Errors
    /// - `SourceWalletNotFound` / `DestinationWalletNotFound` before any write
    /// - `Domain(InsufficientFunds)`, `Domain(InvalidTransaction)` and
    ///   persistence errors after the unit is rolled back
    pub async fn transfer_with_outcome(
        &mut self,
        from_wallet_id: &str,
        to_wallet_id: &str,
        amount: Money,
        description: &str,
    ) -> Result<Transaction, TransferFailure> {
        let from_wallet = self
            .session
            .wallets()
            .find_by_id(from_wallet_id)
            .await
            .map_err(|e| TransferFailure::uncompensated(e.into()))?
            .ok_or_else(|| {
                TransferFailure::uncompensated(AppError::SourceWalletNotFound(
                    from_wallet_id.to_string(),
                ))
            })?;

        let to_wallet = self
            .session
            .wallets()
            .find_by_id(to_wallet_id)
            .await
            .map_err(|e| TransferFailure::uncompensated(e.into()))?
            .ok_or_else(|| {
                TransferFailure::uncompensated(AppError::DestinationWalletNotFound(
                    to_wallet_id.to_string(),
                ))
            })?;

        let unit = Unit::enter(&mut *self.session)
            .await
            .map_err(TransferFailure::uncompensated)?;

        let mut record = None;
        let result = self
            .apply_transfer(&from_wallet, &to_wallet, amount, description, &mut record)
            .await;

        match unit.finish(&mut *self.session, result).await {
            Ok(transaction) => {
                tracing::info!(
                    transaction_id = %transaction.id(),
                    from_wallet_id = %from_wallet_id,
                    to_wallet_id = %to_wallet_id,
                    amount_cents = amount.to_cents(),
                    "Transfer completed"
                );
                Ok(transaction)
            }
            Err(cause) => {
                let compensation = match record {
                    Some(pending) => self.compensate(&pending, &cause).await,
                    None => CompensationOutcome::NotAttempted,
                };
                Err(TransferFailure {
                    cause,
                    compensation,
                })
            }
        }
    }

    async fn apply_transfer(
        &mut self,
        from_wallet: &Wallet,
        to_wallet: &Wallet,
        amount: Money,
        description: &str,
        record: &mut Option<Transaction>,
    ) -> AppResult<Transaction> {
        let pending =
            Transaction::create_transfer(from_wallet.id(), to_wallet.id(), amount, description)?;
        *record = Some(pending.clone());
        self.session.transactions().save(&pending).await?;

        let debited = from_wallet.withdraw(&amount)?;
        self.session.wallets().save(&debited).await?;

        let credited = to_wallet.deposit(&amount);
        self.session.wallets().save(&credited).await?;

        let completed = pending.complete()?;
        Ok(self.session.transactions().save(&completed).await?)
    }

    /// Store the transfer record as FAILED. Never returns an error; the
    /// original cause is what the caller reports.
    async fn compensate(&mut self, pending: &Transaction, cause: &AppError) -> CompensationOutcome {
        let failed = match pending.fail() {
            Ok(failed) => failed,
            Err(e) => return CompensationOutcome::CompensationFailed(e.to_string()),
        };

        match self.session.transactions().save(&failed).await {
            Ok(saved) => {
                tracing::warn!(
                    transaction_id = %saved.id(),
                    cause = %cause,
                    "Transfer failed, recorded as FAILED"
                );
                CompensationOutcome::MarkedFailed(saved)
            }
            Err(e) => {
                tracing::error!(
                    transaction_id = %pending.id(),
                    cause = %cause,
                    error = %e,
                    "Transfer failed and the FAILED record could not be stored"
                );
                CompensationOutcome::CompensationFailed(e.to_string())
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn find_by_id(&mut self, id: &str) -> AppResult<Option<Transaction>> {
        Ok(self.session.transactions().find_by_id(id).await?)
    }
}
