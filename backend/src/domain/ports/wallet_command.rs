//! Driving port for crediting token wallets.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::idempotency::Replayable;
use crate::domain::{Error, IdempotencyKey, PaymentReference, TokenAmount, TopUpReceipt, UserId};

/// Request to credit tokens bought through the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpRequest {
    /// Wallet owner.
    pub user_id: UserId,
    /// Tokens to credit.
    pub amount: TokenAmount,
    /// Provider reference of the settled payment.
    pub payment_reference: PaymentReference,
    /// Optional idempotency key for safe retries.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Response from a top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpResponse {
    /// Credit that now backs the balance.
    pub receipt: TopUpReceipt,
    /// `true` when the payment reference or idempotency key had already been
    /// processed and nothing was credited this time.
    #[serde(default)]
    pub replayed: bool,
}

impl Replayable for TopUpResponse {
    fn mark_replayed(mut self) -> Self {
        self.replayed = true;
        self
    }
}

/// Driving port for wallet credits.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletCommand: Send + Sync {
    /// Credit a wallet once per payment reference.
    ///
    /// # Errors
    ///
    /// Returns `conflict` when the payment reference was already credited to
    /// another user or with another amount.
    async fn top_up(&self, request: TopUpRequest) -> Result<TopUpResponse, Error>;
}

/// Fixture that credits onto an empty wallet.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureWalletCommand;

#[async_trait]
impl WalletCommand for FixtureWalletCommand {
    async fn top_up(&self, request: TopUpRequest) -> Result<TopUpResponse, Error> {
        let amount = request.amount.get();
        Ok(TopUpResponse {
            receipt: TopUpReceipt {
                ledger_entry_id: uuid::Uuid::nil(),
                user_id: request.user_id,
                amount,
                balance_after: u64::from(amount),
                payment_reference: request.payment_reference,
                credited_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            },
            replayed: false,
        })
    }
}
