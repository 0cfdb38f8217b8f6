//! Driving port for reading wallets, ledger history and audits.

use async_trait::async_trait;

use crate::domain::{Error, LedgerEntry, UserId, Wallet, WalletAudit};

/// Default number of ledger entries returned by [`WalletQuery::history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
/// Largest number of ledger entries returned by [`WalletQuery::history`].
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Driving port for wallet reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletQuery: Send + Sync {
    /// Current wallet; users who never topped up have a zero balance.
    async fn wallet(&self, user_id: &UserId) -> Result<Wallet, Error>;

    /// Ledger entries, newest first.
    async fn history(&self, user_id: &UserId, limit: usize) -> Result<Vec<LedgerEntry>, Error>;

    /// Compare the stored balance with the ledger sum.
    async fn audit(&self, user_id: &UserId) -> Result<WalletAudit, Error>;
}

/// Fixture where every wallet is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureWalletQuery;

#[async_trait]
impl WalletQuery for FixtureWalletQuery {
    async fn wallet(&self, user_id: &UserId) -> Result<Wallet, Error> {
        Ok(Wallet::empty(
            *user_id,
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        ))
    }

    async fn history(&self, _user_id: &UserId, _limit: usize) -> Result<Vec<LedgerEntry>, Error> {
        Ok(Vec::new())
    }

    async fn audit(&self, user_id: &UserId) -> Result<WalletAudit, Error> {
        Ok(WalletAudit::reconcile(*user_id, 0, Default::default()))
    }
}
