//! Driving port for reading jobs with their promotion status.

use async_trait::async_trait;

use crate::domain::{Error, JobId, JobView};

/// Listing parameters accepted from clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListJobsRequest {
    /// Only jobs in this category.
    pub category: Option<String>,
    /// Page size; defaults and bounds are applied by the implementation.
    pub limit: Option<usize>,
}

/// Driving port for job reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQuery: Send + Sync {
    /// A single job, promotion evaluated at request time.
    async fn job(&self, job_id: &JobId) -> Result<JobView, Error>;

    /// Jobs with active promotions first, then newest.
    async fn list(&self, request: ListJobsRequest) -> Result<Vec<JobView>, Error>;
}

/// Fixture with no jobs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureJobQuery;

#[async_trait]
impl JobQuery for FixtureJobQuery {
    async fn job(&self, job_id: &JobId) -> Result<JobView, Error> {
        Err(Error::not_found(format!("job {job_id} not found")))
    }

    async fn list(&self, _request: ListJobsRequest) -> Result<Vec<JobView>, Error> {
        Ok(Vec::new())
    }
}
