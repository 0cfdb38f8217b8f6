//! Job promotion service.
//!
//! Implements [`PromotionCommand`] on top of the token ledger. The rules live
//! in [`crate::domain::authorize_promotion`] and are evaluated by the ledger
//! adapter inside its transaction; this service supplies the clock, wraps the
//! call in idempotency handling and turns rejections into API errors.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{
    IdempotencyRepository, PromoteJobRequest, PromoteJobResponse, PromotionCommand,
    PromotionOutcome, PromotionSpend, TokenLedgerRepository,
};
use crate::domain::wallet_service::map_ledger_error;
use crate::domain::{
    Error, IdempotencyLookupQuery, IdempotentMutation, MutationType, PayloadHash,
    PromotionRejection, canonicalize_and_hash,
};

/// Promotion service implementing the [`PromotionCommand`] driving port.
#[derive(Clone)]
pub struct PromotionService<L, I> {
    ledger: Arc<L>,
    idempotency_repo: Arc<I>,
    clock: Arc<dyn Clock>,
}

impl<L, I> PromotionService<L, I> {
    /// Create a service over the given repositories and clock.
    pub fn new(ledger: Arc<L>, idempotency_repo: Arc<I>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            idempotency_repo,
            clock,
        }
    }
}

impl<L, I> PromotionService<L, I>
where
    L: TokenLedgerRepository,
    I: IdempotencyRepository,
{
    pub(crate) fn payload_hash(request: &PromoteJobRequest) -> PayloadHash {
        canonicalize_and_hash(&json!({
            "jobId": request.job_id,
            "tier": request.tier,
        }))
    }

    async fn perform(&self, request: &PromoteJobRequest) -> Result<PromoteJobResponse, Error> {
        let spend = PromotionSpend {
            job_id: request.job_id,
            tier: request.tier,
            actor: request.actor,
            requested_at: self.clock.utc(),
        };

        let outcome = self
            .ledger
            .apply_promotion(&spend)
            .await
            .map_err(map_ledger_error)?;

        match outcome {
            PromotionOutcome::Applied(receipt) => {
                info!(
                    job_id = %receipt.job_id,
                    tier = %receipt.tier,
                    tokens_spent = receipt.tokens_spent,
                    balance_after = receipt.balance_after,
                    expires_at = %receipt.expires_at,
                    "job promoted"
                );
                Ok(PromoteJobResponse {
                    receipt,
                    replayed: false,
                })
            }
            PromotionOutcome::Rejected(rejection) => {
                debug!(job_id = %spend.job_id, reason = %rejection, "promotion rejected");
                Err(rejection_error(rejection))
            }
        }
    }
}

/// Translate a refused promotion into the API error clients see.
pub(crate) fn rejection_error(rejection: PromotionRejection) -> Error {
    let message = rejection.to_string();
    match rejection {
        PromotionRejection::JobNotFound { job_id } => Error::not_found(message)
            .with_details(json!({ "code": "job_not_found", "jobId": job_id })),
        PromotionRejection::NotJobOwner { job_id } => Error::forbidden(message)
            .with_details(json!({ "code": "not_job_owner", "jobId": job_id })),
        PromotionRejection::InsufficientTokens { balance, cost } => Error::payment_required(
            message,
        )
        .with_details(json!({
            "code": "insufficient_tokens",
            "balance": balance,
            "cost": cost,
        })),
        PromotionRejection::AlreadyPromoted { tier, expires_at } => Error::conflict(message)
            .with_details(json!({
                "code": "promotion_active",
                "tier": tier,
                "expiresAt": expires_at,
            })),
    }
}

#[async_trait]
impl<L, I> PromotionCommand for PromotionService<L, I>
where
    L: TokenLedgerRepository,
    I: IdempotencyRepository,
{
    async fn promote_job(&self, request: PromoteJobRequest) -> Result<PromoteJobResponse, Error> {
        let Some(key) = request.idempotency_key else {
            return self.perform(&request).await;
        };

        let query = IdempotencyLookupQuery::new(
            key,
            request.actor,
            MutationType::Promotions,
            Self::payload_hash(&request),
        );
        IdempotentMutation::new(self.idempotency_repo.as_ref(), self.clock.as_ref(), query)
            .run(|| self.perform(&request))
            .await
    }
}

#[cfg(test)]
#[path = "promotion_service_tests.rs"]
mod tests;
