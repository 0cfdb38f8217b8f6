//! Job promotion HTTP handlers.
//!
//! ```text
//! GET  /api/v1/promotion-tiers
//! POST /api/v1/jobs/{job_id}/promotion
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{PromoteJobRequest, PromoteJobResponse};
use crate::domain::{Error, JobId, PromotionTier};
use crate::inbound::http::ApiResult;
use crate::inbound::http::actor::ActingUser;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_job_id, parse_tier};

const JOB_ID: FieldName = FieldName::new("jobId");
const TIER: FieldName = FieldName::new("tier");

/// Path parameters for job-scoped endpoints.
#[derive(Debug, Deserialize)]
pub struct JobPath {
    pub job_id: String,
}

/// Request payload for promoting a job.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoteJobBody {
    /// Tier name, case-insensitive.
    #[schema(example = "Gold")]
    pub tier: Option<String>,
}

/// One entry of the tier catalogue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionTierResponse {
    #[schema(example = "Gold")]
    pub tier: String,
    #[schema(example = 10)]
    pub cost: u32,
    #[schema(example = 7)]
    pub duration_days: i64,
}

impl From<PromotionTier> for PromotionTierResponse {
    fn from(tier: PromotionTier) -> Self {
        Self {
            tier: tier.tag().to_owned(),
            cost: tier.cost(),
            duration_days: tier.duration_days(),
        }
    }
}

/// Receipt for an applied promotion.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionReceiptResponse {
    pub job_id: String,
    pub tier: String,
    pub tokens_spent: u32,
    pub balance_after: u64,
    pub promoted_at: String,
    pub expires_at: String,
    pub ledger_entry_id: String,
    /// True when the response was replayed from an earlier request.
    pub replayed: bool,
}

impl From<PromoteJobResponse> for PromotionReceiptResponse {
    fn from(value: PromoteJobResponse) -> Self {
        let PromoteJobResponse { receipt, replayed } = value;
        Self {
            job_id: receipt.job_id.to_string(),
            tier: receipt.tier.tag().to_owned(),
            tokens_spent: receipt.tokens_spent,
            balance_after: receipt.balance_after,
            promoted_at: receipt.promoted_at.to_rfc3339(),
            expires_at: receipt.expires_at.to_rfc3339(),
            ledger_entry_id: receipt.ledger_entry_id.to_string(),
            replayed,
        }
    }
}

fn parse_promotion_request(
    path: JobPath,
    body: PromoteJobBody,
) -> Result<(JobId, PromotionTier), Error> {
    let job_id = parse_job_id(&path.job_id, JOB_ID)?;
    let tier = body.tier.ok_or_else(|| missing_field_error(TIER))?;
    Ok((job_id, parse_tier(tier.trim(), TIER)?))
}

/// List the promotion tiers with their cost and duration.
#[utoipa::path(
    get,
    path = "/api/v1/promotion-tiers",
    responses(
        (status = 200, description = "Promotion tiers, cheapest first", body = [PromotionTierResponse])
    ),
    tags = ["promotions"],
    security([]),
    operation_id = "listPromotionTiers"
)]
#[get("/promotion-tiers")]
pub async fn list_tiers() -> web::Json<Vec<PromotionTierResponse>> {
    web::Json(
        PromotionTier::ALL
            .into_iter()
            .map(PromotionTierResponse::from)
            .collect(),
    )
}

/// Spend wallet tokens to promote one of the acting user's jobs.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{job_id}/promotion",
    request_body = PromoteJobBody,
    params(
        ("job_id" = String, Path, description = "Job identifier"),
        ("Idempotency-Key" = Option<String>, Header, description = "UUID for idempotent requests")
    ),
    responses(
        (status = 201, description = "Job promoted", body = PromotionReceiptResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 402, description = "Insufficient tokens", body = ErrorSchema),
        (status = 403, description = "Job belongs to another employer", body = ErrorSchema),
        (status = 404, description = "Job not found", body = ErrorSchema),
        (status = 409, description = "Job already promoted or idempotency key reused", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["promotions"],
    operation_id = "promoteJob"
)]
#[post("/jobs/{job_id}/promotion")]
pub async fn promote_job(
    state: web::Data<HttpState>,
    actor: ActingUser,
    request: HttpRequest,
    path: web::Path<JobPath>,
    payload: web::Json<PromoteJobBody>,
) -> ApiResult<HttpResponse> {
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let (job_id, tier) = parse_promotion_request(path.into_inner(), payload.into_inner())?;

    let response = state
        .promotions
        .promote_job(PromoteJobRequest {
            actor: actor.id(),
            job_id,
            tier,
            idempotency_key,
        })
        .await?;

    Ok(HttpResponse::Created().json(PromotionReceiptResponse::from(response)))
}

#[cfg(test)]
#[path = "promotions_tests.rs"]
mod tests;
