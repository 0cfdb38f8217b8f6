//! Job read service.
//!
//! Evaluates promotion status at request time, so an expired promotion stops
//! boosting a job the moment its window closes without any cleanup job.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;

use crate::domain::ports::{JobQuery, JobRepository, JobRepositoryError, ListJobsRequest};
use crate::domain::{
    DEFAULT_JOB_LIST_LIMIT, Error, JobId, JobListFilter, JobView, MAX_JOB_LIST_LIMIT,
};

/// Job read service implementing [`JobQuery`].
#[derive(Clone)]
pub struct JobQueryService<J> {
    jobs: Arc<J>,
    clock: Arc<dyn Clock>,
}

impl<J> JobQueryService<J> {
    /// Create a service over the given repository and clock.
    pub fn new(jobs: Arc<J>, clock: Arc<dyn Clock>) -> Self {
        Self { jobs, clock }
    }
}

fn map_job_error(error: JobRepositoryError) -> Error {
    if error.is_transient() {
        Error::service_unavailable(error.to_string())
    } else {
        Error::internal(error.to_string())
    }
}

fn normalise_category(category: Option<String>) -> Option<String> {
    category
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<J> JobQuery for JobQueryService<J>
where
    J: JobRepository,
{
    async fn job(&self, job_id: &JobId) -> Result<JobView, Error> {
        let job = self
            .jobs
            .find_by_id(job_id)
            .await
            .map_err(map_job_error)?
            .ok_or_else(|| {
                Error::not_found(format!("job {job_id} not found"))
                    .with_details(json!({ "code": "job_not_found", "jobId": job_id }))
            })?;
        Ok(JobView::at(job, self.clock.utc()))
    }

    async fn list(&self, request: ListJobsRequest) -> Result<Vec<JobView>, Error> {
        let limit = request.limit.unwrap_or(DEFAULT_JOB_LIST_LIMIT);
        if !(1..=MAX_JOB_LIST_LIMIT).contains(&limit) {
            return Err(Error::invalid_request(format!(
                "limit must be between 1 and {MAX_JOB_LIST_LIMIT}"
            ))
            .with_details(json!({
                "code": "invalid_limit",
                "field": "limit",
                "value": limit,
            })));
        }

        let now = self.clock.utc();
        let filter = JobListFilter {
            category: normalise_category(request.category),
            active_at: now,
            limit,
        };
        let jobs = self.jobs.list(&filter).await.map_err(map_job_error)?;
        Ok(jobs.into_iter().map(|job| JobView::at(job, now)).collect())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::MockJobRepository;
    use crate::domain::{ErrorCode, Job, Promotion, PromotionTier, UserId};
    use crate::test_support::{MutableClock, fixture_timestamp};
    use chrono::TimeDelta;
    use rstest::rstest;

    fn service(jobs: MockJobRepository, clock: Arc<MutableClock>) -> JobQueryService<MockJobRepository> {
        JobQueryService::new(Arc::new(jobs), clock)
    }

    #[tokio::test]
    async fn job_reports_promotion_as_expired_once_window_closes() {
        let job = Job::builder(JobId::random(), UserId::random())
            .promotion(Some(Promotion::starting_at(
                PromotionTier::Silver,
                fixture_timestamp(),
            )))
            .build();
        let job_id = job.id;
        let mut jobs = MockJobRepository::new();
        jobs.expect_find_by_id()
            .times(2)
            .returning(move |_| Ok(Some(job.clone())));
        let clock = Arc::new(MutableClock::at_fixture());
        let service = service(jobs, Arc::clone(&clock));

        let active = service.job(&job_id).await.expect("job");
        assert!(active.active_promotion.is_some());

        clock.advance(PromotionTier::Silver.duration() + TimeDelta::seconds(1));
        let expired = service.job(&job_id).await.expect("job");
        assert!(expired.active_promotion.is_none());
        assert!(expired.job.promotion.is_some());
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let mut jobs = MockJobRepository::new();
        jobs.expect_find_by_id().return_once(|_| Ok(None));

        let err = service(jobs, Arc::new(MutableClock::at_fixture()))
            .job(&JobId::random())
            .await
            .expect_err("not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[case(None, None, DEFAULT_JOB_LIST_LIMIT, None)]
    #[case(Some("  design ".to_owned()), Some(5), 5, Some("design"))]
    #[case(Some("   ".to_owned()), Some(MAX_JOB_LIST_LIMIT), MAX_JOB_LIST_LIMIT, None)]
    #[tokio::test]
    async fn list_builds_filter(
        #[case] category: Option<String>,
        #[case] limit: Option<usize>,
        #[case] expected_limit: usize,
        #[case] expected_category: Option<&'static str>,
    ) {
        let mut jobs = MockJobRepository::new();
        jobs.expect_list()
            .withf(move |filter: &JobListFilter| {
                filter.limit == expected_limit
                    && filter.category.as_deref() == expected_category
                    && filter.active_at == fixture_timestamp()
            })
            .times(1)
            .return_once(|_| Ok(Vec::new()));

        let listed = service(jobs, Arc::new(MutableClock::at_fixture()))
            .list(ListJobsRequest { category, limit })
            .await
            .expect("listing");
        assert!(listed.is_empty());
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_JOB_LIST_LIMIT + 1)]
    #[tokio::test]
    async fn list_rejects_out_of_range_limit(#[case] limit: usize) {
        let mut jobs = MockJobRepository::new();
        jobs.expect_list().never();

        let err = service(jobs, Arc::new(MutableClock::at_fixture()))
            .list(ListJobsRequest {
                category: None,
                limit: Some(limit),
            })
            .await
            .expect_err("invalid limit");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["code"], json!("invalid_limit"));
        assert_eq!(details["value"], json!(limit));
    }

    #[tokio::test]
    async fn repository_outage_is_service_unavailable() {
        let mut jobs = MockJobRepository::new();
        jobs.expect_list()
            .return_once(|_| Err(JobRepositoryError::connection("pool exhausted")));

        let err = service(jobs, Arc::new(MutableClock::at_fixture()))
            .list(ListJobsRequest::default())
            .await
            .expect_err("outage");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
