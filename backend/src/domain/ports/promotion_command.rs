//! Driving port for promoting jobs.
//!
//! The [`PromotionCommand`] trait is what HTTP handlers call when an employer
//! spends tokens on a job promotion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::idempotency::Replayable;
use crate::domain::{Error, IdempotencyKey, JobId, PromotionReceipt, PromotionTier, UserId};

/// Request to promote a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoteJobRequest {
    /// Authenticated user spending the tokens.
    pub actor: UserId,
    /// Job to promote.
    pub job_id: JobId,
    /// Requested tier.
    pub tier: PromotionTier,
    /// Optional idempotency key for safe retries.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Response from promoting a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteJobResponse {
    /// What was spent and until when the job is promoted.
    pub receipt: PromotionReceipt,
    /// Whether this response was replayed from a previous request.
    #[serde(default)]
    pub replayed: bool,
}

impl Replayable for PromoteJobResponse {
    fn mark_replayed(mut self) -> Self {
        self.replayed = true;
        self
    }
}

/// Driving port for job promotions.
///
/// # Errors
///
/// Implementations refuse a promotion with:
/// - `not_found` when the job does not exist;
/// - `forbidden` when the actor does not own the job;
/// - `payment_required` when the wallet cannot cover the tier cost;
/// - `conflict` when the job is already promoted, or the idempotency key was
///   used with a different payload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromotionCommand: Send + Sync {
    /// Spend tokens to promote a job.
    async fn promote_job(&self, request: PromoteJobRequest) -> Result<PromoteJobResponse, Error>;
}

/// Fixture that promotes every job for free.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePromotionCommand;

#[async_trait]
impl PromotionCommand for FixturePromotionCommand {
    async fn promote_job(&self, request: PromoteJobRequest) -> Result<PromoteJobResponse, Error> {
        let promoted_at = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
        Ok(PromoteJobResponse {
            receipt: PromotionReceipt {
                job_id: request.job_id,
                tier: request.tier,
                tokens_spent: 0,
                balance_after: 0,
                promoted_at,
                expires_at: promoted_at + request.tier.duration(),
                ledger_entry_id: uuid::Uuid::nil(),
            },
            replayed: false,
        })
    }
}
