//! Driven port for reading job postings.
//!
//! Job creation and editing live in the posting service; this backend only
//! reads jobs and, through the token ledger, sets their promotion.

use async_trait::async_trait;

use crate::domain::{Job, JobId, JobListFilter};

use super::define_port_error;

define_port_error! {
    /// Errors raised by job repository adapters.
    pub enum JobRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "job repository connection failed: {message}"; transient,
        /// Query failed during execution.
        Query { message: String } => "job repository query failed: {message}",
    }
}

/// Port for job lookups and listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Fetch a job by id.
    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<Job>, JobRepositoryError>;

    /// List jobs matching `filter`, ranked by active promotion then recency.
    async fn list(&self, filter: &JobListFilter) -> Result<Vec<Job>, JobRepositoryError>;
}

/// Fixture with no jobs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureJobRepository;

#[async_trait]
impl JobRepository for FixtureJobRepository {
    async fn find_by_id(&self, _job_id: &JobId) -> Result<Option<Job>, JobRepositoryError> {
        Ok(None)
    }

    async fn list(&self, _filter: &JobListFilter) -> Result<Vec<Job>, JobRepositoryError> {
        Ok(Vec::new())
    }
}
