//! Token wallet service.
//!
//! Implements [`WalletCommand`] (top-ups) and [`WalletQuery`] (balance,
//! history, audit) over the token ledger.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    CreditOutcome, IdempotencyRepository, MAX_HISTORY_LIMIT, TokenLedgerRepository,
    TokenLedgerRepositoryError, TopUpRequest, TopUpResponse, WalletCommand, WalletCredit,
    WalletQuery,
};
use crate::domain::{
    Error, IdempotencyLookupQuery, IdempotentMutation, LedgerEntry, MutationType, PayloadHash,
    TopUpReceipt, UserId, Wallet, WalletAudit, canonicalize_and_hash,
};

/// Map ledger adapter failures to domain errors.
pub(crate) fn map_ledger_error(error: TokenLedgerRepositoryError) -> Error {
    match error {
        TokenLedgerRepositoryError::DuplicateReference { reference } => reference_reused(&reference),
        other if other.is_transient() => Error::service_unavailable(other.to_string()),
        other => Error::internal(other.to_string()),
    }
}

fn reference_reused(reference: &str) -> Error {
    Error::conflict("payment reference already credited").with_details(json!({
        "code": "payment_reference_reused",
        "paymentReference": reference,
    }))
}

/// Wallet service implementing the wallet driving ports.
#[derive(Clone)]
pub struct WalletService<L, I> {
    ledger: Arc<L>,
    idempotency_repo: Arc<I>,
    clock: Arc<dyn Clock>,
}

impl<L, I> WalletService<L, I> {
    /// Create a service over the given repositories and clock.
    pub fn new(ledger: Arc<L>, idempotency_repo: Arc<I>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            idempotency_repo,
            clock,
        }
    }
}

impl<L, I> WalletService<L, I>
where
    L: TokenLedgerRepository,
    I: IdempotencyRepository,
{
    pub(crate) fn payload_hash(request: &TopUpRequest) -> PayloadHash {
        canonicalize_and_hash(&json!({
            "amount": request.amount.get(),
            "paymentReference": request.payment_reference.as_str(),
        }))
    }

    async fn perform_top_up(&self, request: &TopUpRequest) -> Result<TopUpResponse, Error> {
        let credit = WalletCredit {
            user_id: request.user_id,
            amount: request.amount,
            payment_reference: request.payment_reference.clone(),
            requested_at: self.clock.utc(),
        };

        match self.ledger.credit(&credit).await.map_err(map_ledger_error)? {
            CreditOutcome::Applied(receipt) => {
                info!(
                    user_id = %receipt.user_id,
                    amount = receipt.amount,
                    balance_after = receipt.balance_after,
                    payment_reference = %receipt.payment_reference,
                    "wallet topped up"
                );
                Ok(TopUpResponse {
                    receipt,
                    replayed: false,
                })
            }
            CreditOutcome::AlreadyApplied(entry) => Self::replay_credit(&credit, &entry),
        }
    }

    /// A resent payment notification replays the original receipt, but only
    /// when it describes the same credit.
    fn replay_credit(credit: &WalletCredit, entry: &LedgerEntry) -> Result<TopUpResponse, Error> {
        let same_credit =
            entry.user_id == credit.user_id && entry.amount == i64::from(credit.amount.get());
        if !same_credit {
            warn!(
                payment_reference = %credit.payment_reference,
                "payment reference reused for a different credit"
            );
            return Err(reference_reused(credit.payment_reference.as_str()));
        }

        let receipt = TopUpReceipt::from_entry(entry).ok_or_else(|| {
            Error::internal(format!(
                "ledger entry {} for payment reference is not a top-up",
                entry.id
            ))
        })?;
        Ok(TopUpResponse {
            receipt,
            replayed: true,
        })
    }
}

#[async_trait]
impl<L, I> WalletCommand for WalletService<L, I>
where
    L: TokenLedgerRepository,
    I: IdempotencyRepository,
{
    async fn top_up(&self, request: TopUpRequest) -> Result<TopUpResponse, Error> {
        let Some(key) = request.idempotency_key else {
            return self.perform_top_up(&request).await;
        };

        let query = IdempotencyLookupQuery::new(
            key,
            request.user_id,
            MutationType::TopUps,
            Self::payload_hash(&request),
        );
        IdempotentMutation::new(self.idempotency_repo.as_ref(), self.clock.as_ref(), query)
            .run(|| self.perform_top_up(&request))
            .await
    }
}

#[async_trait]
impl<L, I> WalletQuery for WalletService<L, I>
where
    L: TokenLedgerRepository,
    I: IdempotencyRepository,
{
    async fn wallet(&self, user_id: &UserId) -> Result<Wallet, Error> {
        let wallet = self
            .ledger
            .find_wallet(user_id)
            .await
            .map_err(map_ledger_error)?;
        Ok(wallet.unwrap_or_else(|| Wallet::empty(*user_id, self.clock.utc())))
    }

    async fn history(&self, user_id: &UserId, limit: usize) -> Result<Vec<LedgerEntry>, Error> {
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(Error::invalid_request(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}"
            ))
            .with_details(json!({
                "code": "invalid_limit",
                "field": "limit",
                "value": limit,
            })));
        }
        self.ledger
            .list_entries(user_id, limit)
            .await
            .map_err(map_ledger_error)
    }

    async fn audit(&self, user_id: &UserId) -> Result<WalletAudit, Error> {
        let stored_balance = self
            .ledger
            .find_wallet(user_id)
            .await
            .map_err(map_ledger_error)?
            .map_or(0, |wallet| wallet.balance);
        let totals = self
            .ledger
            .ledger_totals(user_id)
            .await
            .map_err(map_ledger_error)?;

        let audit = WalletAudit::reconcile(*user_id, stored_balance, totals);
        if !audit.is_consistent() {
            warn!(
                user_id = %user_id,
                stored_balance = audit.stored_balance,
                ledger_balance = audit.ledger_balance,
                drift = audit.drift,
                "wallet balance drifted from ledger"
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
#[path = "wallet_service_tests.rs"]
mod tests;
