//! Job postings as seen by the promotion subsystem.
//!
//! Jobs are created and edited elsewhere; this service reads them, checks
//! ownership, and writes the promotion tag and expiry.

use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Promotion, UserId};

/// Default page size for job listings.
pub const DEFAULT_JOB_LIST_LIMIT: usize = 20;
/// Largest accepted page size for job listings.
pub const MAX_JOB_LIST_LIMIT: usize = 100;

/// Job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Job identifier.
    pub id: JobId,
    /// Employer who posted the job.
    pub employer_id: UserId,
    /// Headline shown in listings.
    pub title: String,
    /// Marketplace category.
    pub category: String,
    /// Lower bound of the offered price.
    pub min_price: u64,
    /// Upper bound of the offered price.
    pub max_price: u64,
    /// Application deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Most recent promotion, possibly expired.
    pub promotion: Option<Promotion>,
    /// Posting time.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Start building a job owned by `employer_id`.
    pub fn builder(id: JobId, employer_id: UserId) -> JobBuilder {
        JobBuilder::new(id, employer_id)
    }

    /// Whether `user` posted this job.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.employer_id == *user
    }

    /// The promotion if it is still running at `now`.
    pub fn active_promotion(&self, now: DateTime<Utc>) -> Option<&Promotion> {
        self.promotion
            .as_ref()
            .filter(|promotion| promotion.is_active_at(now))
    }

    fn listing_rank(&self, now: DateTime<Utc>) -> u8 {
        self.active_promotion(now)
            .map_or(0, |promotion| promotion.tier.rank())
    }
}

/// Builder for [`Job`], mostly used by adapters and tests.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    fn new(id: JobId, employer_id: UserId) -> Self {
        Self {
            job: Job {
                id,
                employer_id,
                title: String::new(),
                category: String::new(),
                min_price: 0,
                max_price: 0,
                deadline: None,
                promotion: None,
                created_at: DateTime::<Utc>::UNIX_EPOCH,
            },
        }
    }

    /// Set the headline.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.job.title = title.into();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.job.category = category.into();
        self
    }

    /// Set the price range.
    pub fn price_range(mut self, min_price: u64, max_price: u64) -> Self {
        self.job.min_price = min_price;
        self.job.max_price = max_price;
        self
    }

    /// Set the deadline.
    pub fn deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.job.deadline = deadline;
        self
    }

    /// Set the current promotion.
    pub fn promotion(mut self, promotion: Option<Promotion>) -> Self {
        self.job.promotion = promotion;
        self
    }

    /// Set the posting time.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.job.created_at = created_at;
        self
    }

    /// Finish building.
    pub fn build(self) -> Job {
        self.job
    }
}

/// A job together with its promotion status at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    /// The stored job.
    pub job: Job,
    /// Promotion still running at the evaluation time.
    pub active_promotion: Option<Promotion>,
}

impl JobView {
    /// Evaluate `job` at `now`.
    pub fn at(job: Job, now: DateTime<Utc>) -> Self {
        let active_promotion = job.active_promotion(now).copied();
        Self {
            job,
            active_promotion,
        }
    }
}

/// Filter for job listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListFilter {
    /// Only jobs in this category.
    pub category: Option<String>,
    /// Instant promotions are evaluated at.
    pub active_at: DateTime<Utc>,
    /// Maximum number of jobs returned.
    pub limit: usize,
}

/// Order jobs for a listing and keep the first `limit`.
///
/// Jobs with an active promotion come first, Premium before Gold before
/// Silver; within a rank newer jobs come first.
///
/// # Examples
/// ```
/// use chrono::{TimeDelta, Utc};
/// use gigzz_backend::domain::{Job, JobId, Promotion, PromotionTier, UserId, rank_listing};
///
/// let now = Utc::now();
/// let employer = UserId::random();
/// let plain = Job::builder(JobId::random(), employer).created_at(now).build();
/// let promoted = Job::builder(JobId::random(), employer)
///     .created_at(now - TimeDelta::days(5))
///     .promotion(Some(Promotion::starting_at(PromotionTier::Silver, now)))
///     .build();
/// let ranked = rank_listing(vec![plain.clone(), promoted.clone()], now, 10);
/// assert_eq!(ranked, vec![promoted, plain]);
/// ```
pub fn rank_listing(mut jobs: Vec<Job>, now: DateTime<Utc>, limit: usize) -> Vec<Job> {
    jobs.sort_by_key(|job| (Reverse(job.listing_rank(now)), Reverse(job.created_at), job.id));
    jobs.truncate(limit);
    jobs
}
