//! Job listing HTTP handlers.
//!
//! ```text
//! GET /api/v1/jobs?category=&limit=
//! GET /api/v1/jobs/{job_id}
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::JobView;
use crate::domain::ports::ListJobsRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::promotions::JobPath;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_job_id};

/// Query parameters for the job listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    /// Only list jobs in this category.
    pub category: Option<String>,
    /// Page size, 1 to 100 (default 20).
    pub limit: Option<usize>,
}

/// Promotion currently boosting a job.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivePromotionResponse {
    #[schema(example = "Premium")]
    pub tier: String,
    pub expires_at: String,
}

/// Job posting with its promotion status at request time.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: String,
    pub employer_id: String,
    pub title: String,
    pub category: String,
    pub min_price: u64,
    pub max_price: u64,
    pub deadline: Option<String>,
    pub created_at: String,
    /// Absent when the job was never promoted or its promotion expired.
    pub promotion: Option<ActivePromotionResponse>,
}

impl From<JobView> for JobResponse {
    fn from(view: JobView) -> Self {
        let JobView {
            job,
            active_promotion,
        } = view;
        Self {
            id: job.id.to_string(),
            employer_id: job.employer_id.to_string(),
            title: job.title,
            category: job.category,
            min_price: job.min_price,
            max_price: job.max_price,
            deadline: job.deadline.map(|deadline| deadline.to_rfc3339()),
            created_at: job.created_at.to_rfc3339(),
            promotion: active_promotion.map(|promotion| ActivePromotionResponse {
                tier: promotion.tier.tag().to_owned(),
                expires_at: promotion.expires_at.to_rfc3339(),
            }),
        }
    }
}

/// List jobs with active promotions first.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    params(JobListQuery),
    responses(
        (status = 200, description = "Jobs, promoted first", body = [JobResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["jobs"],
    security([]),
    operation_id = "listJobs"
)]
#[get("/jobs")]
pub async fn list_jobs(
    state: web::Data<HttpState>,
    query: web::Query<JobListQuery>,
) -> ApiResult<web::Json<Vec<JobResponse>>> {
    let JobListQuery { category, limit } = query.into_inner();
    let jobs = state.jobs.list(ListJobsRequest { category, limit }).await?;
    Ok(web::Json(jobs.into_iter().map(JobResponse::from).collect()))
}

/// Fetch one job.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    params(("job_id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Job", body = JobResponse),
        (status = 400, description = "Invalid job id", body = ErrorSchema),
        (status = 404, description = "Job not found", body = ErrorSchema)
    ),
    tags = ["jobs"],
    security([]),
    operation_id = "getJob"
)]
#[get("/jobs/{job_id}")]
pub async fn get_job(
    state: web::Data<HttpState>,
    path: web::Path<JobPath>,
) -> ApiResult<web::Json<JobResponse>> {
    let job_id = parse_job_id(&path.job_id, FieldName::new("jobId"))?;
    let view = state.jobs.job(&job_id).await?;
    Ok(web::Json(JobResponse::from(view)))
}
