//! PostgreSQL-backed [`JobRepository`].

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{JobRepository, JobRepositoryError};
use crate::domain::{Job, JobId, JobListFilter, Promotion, PromotionTier, UserId, rank_listing};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::JobRow;
use super::pool::{DbPool, PoolError};
use super::schema::jobs;

/// Diesel-backed implementation of the [`JobRepository`] port.
#[derive(Clone)]
pub struct DieselJobRepository {
    pool: DbPool,
}

impl DieselJobRepository {
    /// Create a repository backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> JobRepositoryError {
    map_basic_pool_error(error, JobRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> JobRepositoryError {
    map_basic_diesel_error(error, JobRepositoryError::query, JobRepositoryError::connection)
}

/// Convert a stored job row into the domain job.
///
/// A promotion is only materialised when both the tag and the expiry are
/// present; a half-written pair is reported as corruption.
pub(super) fn job_from_row(row: JobRow) -> Result<Job, String> {
    let promotion = match (row.promotion_tag, row.promotion_expires_at) {
        (None, None) => None,
        (Some(tag), Some(expires_at)) => {
            let tier = tag
                .parse::<PromotionTier>()
                .map_err(|err| format!("job {}: {err}", row.id))?;
            Some(Promotion { tier, expires_at })
        }
        _ => return Err(format!("job {}: promotion tag and expiry out of sync", row.id)),
    };
    let price = |value: i64, column: &str| {
        u64::try_from(value).map_err(|_| format!("job {}: negative {column}", row.id))
    };

    let job = Job::builder(JobId::from_uuid(row.id), UserId::from_uuid(row.employer_id))
        .title(row.title)
        .category(row.category)
        .price_range(price(row.min_price, "min_price")?, price(row.max_price, "max_price")?)
        .deadline(row.deadline)
        .promotion(promotion)
        .created_at(row.created_at)
        .build();
    Ok(job)
}

fn category_query(category: Option<&str>) -> jobs::BoxedQuery<'_, Pg> {
    let query = jobs::table.into_boxed();
    match category {
        Some(category) => query.filter(jobs::category.eq(category)),
        None => query,
    }
}

/// `CASE` expression ranking a promotion tag the way [`PromotionTier::rank`]
/// does, so the database can order active promotions before the limit.
fn tier_rank_sql() -> String {
    let arms: String = PromotionTier::ALL
        .iter()
        .map(|tier| format!(" WHEN '{}' THEN {}", tier.tag(), tier.rank()))
        .collect();
    format!("CASE promotion_tag{arms} ELSE 0 END")
}

fn rows_to_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, JobRepositoryError> {
    rows.into_iter()
        .map(|row| job_from_row(row).map_err(JobRepositoryError::query))
        .collect()
}

#[async_trait]
impl JobRepository for DieselJobRepository {
    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<Job>, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<JobRow> = jobs::table
            .find(job_id.as_uuid())
            .select(JobRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(job_from_row)
            .transpose()
            .map_err(JobRepositoryError::query)
    }

    async fn list(&self, filter: &JobListFilter) -> Result<Vec<Job>, JobRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let category = filter.category.as_deref();

        // Active promotions and everything else are fetched separately, each
        // in listing order so the limit keeps the right rows, then merged.
        let promoted: Vec<JobRow> = category_query(category)
            .filter(jobs::promotion_expires_at.gt(filter.active_at))
            .order((
                sql::<Integer>(&tier_rank_sql()).desc(),
                jobs::created_at.desc(),
                jobs::id.asc(),
            ))
            .limit(limit)
            .select(JobRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let regular: Vec<JobRow> = category_query(category)
            .filter(
                jobs::promotion_expires_at
                    .is_null()
                    .or(jobs::promotion_expires_at.le(filter.active_at)),
            )
            .order((jobs::created_at.desc(), jobs::id.asc()))
            .limit(limit)
            .select(JobRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut jobs = rows_to_jobs(promoted)?;
        jobs.extend(rows_to_jobs(regular)?);
        Ok(rank_listing(jobs, filter.active_at, filter.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    #[fixture]
    fn row() -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            title: "Logo refresh".to_owned(),
            category: "design".to_owned(),
            min_price: 100,
            max_price: 250,
            deadline: None,
            promotion_tag: None,
            promotion_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn unpromoted_row_maps_to_job(row: JobRow) {
        let job = job_from_row(row.clone()).expect("valid row");
        assert_eq!(job.id.as_uuid(), &row.id);
        assert_eq!((job.min_price, job.max_price), (100, 250));
        assert!(job.promotion.is_none());
    }

    #[rstest]
    fn promoted_row_carries_tier(mut row: JobRow) {
        let expires_at = Utc::now() + TimeDelta::days(7);
        row.promotion_tag = Some("Gold".to_owned());
        row.promotion_expires_at = Some(expires_at);

        let job = job_from_row(row).expect("valid row");
        assert_eq!(
            job.promotion,
            Some(Promotion {
                tier: PromotionTier::Gold,
                expires_at
            })
        );
    }

    #[rstest]
    #[case(Some("Gold"), None)]
    #[case(Some("Bronze"), Some(Utc::now()))]
    fn inconsistent_promotion_is_rejected(
        mut row: JobRow,
        #[case] tag: Option<&str>,
        #[case] expires_at: Option<chrono::DateTime<Utc>>,
    ) {
        row.promotion_tag = tag.map(str::to_owned);
        row.promotion_expires_at = expires_at;
        assert!(job_from_row(row).is_err());
    }

    #[rstest]
    fn tier_rank_expression_follows_listing_rank() {
        assert_eq!(
            tier_rank_sql(),
            "CASE promotion_tag WHEN 'Silver' THEN 1 WHEN 'Gold' THEN 2 \
             WHEN 'Premium' THEN 3 ELSE 0 END"
        );
    }

    #[rstest]
    fn negative_price_is_rejected(mut row: JobRow) {
        row.min_price = -1;
        assert!(job_from_row(row).is_err());
    }
}
