//! Integration tests for the Diesel job listing against PostgreSQL.
//!
//! Set `GIGZZ_TEST_DATABASE_URL` to a disposable database to run them; the
//! tests skip silently otherwise. Each test lists its own random category,
//! so rows left by other runs never show up.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text, Timestamptz, Uuid as SqlUuid};
use rstest::rstest;
use uuid::Uuid;

use gigzz_backend::domain::ports::JobRepository;
use gigzz_backend::domain::{JobId, JobListFilter, PromotionTier, UserId};
use gigzz_backend::outbound::persistence::{
    DbPool, DieselJobRepository, PoolConfig, run_pending_migrations,
};

const DATABASE_URL_VAR: &str = "GIGZZ_TEST_DATABASE_URL";

struct Listing {
    url: String,
    jobs: DieselJobRepository,
    category: String,
    now: DateTime<Utc>,
}

async fn listing() -> Option<Listing> {
    let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("{DATABASE_URL_VAR} not set; skipping PostgreSQL job tests");
        return None;
    };
    run_pending_migrations(&url).await.expect("migrations apply");
    let pool = DbPool::new(PoolConfig::new(&url).with_max_size(2))
        .await
        .expect("pool builds");
    Some(Listing {
        url,
        jobs: DieselJobRepository::new(pool),
        category: format!("listing-{}", Uuid::new_v4().simple()),
        now: Utc::now().trunc_subsecs(6),
    })
}

impl Listing {
    /// Insert a job `age_days` old, optionally promoted until `expires_in`
    /// from now (negative for an expired promotion).
    fn insert(
        &self,
        category: &str,
        age_days: i64,
        promotion: Option<(PromotionTier, TimeDelta)>,
    ) -> JobId {
        let job_id = JobId::random();
        let mut connection = PgConnection::establish(&self.url).expect("connect");
        diesel::sql_query(
            "INSERT INTO jobs (id, employer_id, title, category, min_price, max_price, \
             promotion_tag, promotion_expires_at, created_at) \
             VALUES ($1, $2, 'Landing page', $3, 50, 150, $4, $5, $6)",
        )
        .bind::<SqlUuid, _>(*job_id.as_uuid())
        .bind::<SqlUuid, _>(*UserId::random().as_uuid())
        .bind::<Text, _>(category)
        .bind::<Nullable<Text>, _>(promotion.map(|(tier, _)| tier.tag()))
        .bind::<Nullable<Timestamptz>, _>(promotion.map(|(_, expires_in)| self.now + expires_in))
        .bind::<Timestamptz, _>(self.now - TimeDelta::days(age_days))
        .execute(&mut connection)
        .expect("insert job");
        job_id
    }

    async fn list(&self, limit: usize) -> Vec<JobId> {
        self.jobs
            .list(&JobListFilter {
                category: Some(self.category.clone()),
                active_at: self.now,
                limit,
            })
            .await
            .expect("listing")
            .into_iter()
            .map(|job| job.id)
            .collect()
    }
}

#[rstest]
#[tokio::test]
async fn higher_tiers_survive_the_limit() {
    let Some(db) = listing().await else {
        return;
    };
    let plain = db.insert(&db.category, 0, None);
    let silver = db.insert(&db.category, 1, Some((PromotionTier::Silver, TimeDelta::days(2))));
    let premium = db.insert(&db.category, 9, Some((PromotionTier::Premium, TimeDelta::days(11))));
    let gold = db.insert(&db.category, 5, Some((PromotionTier::Gold, TimeDelta::days(2))));

    assert_eq!(db.list(1).await, [premium]);
    assert_eq!(db.list(2).await, [premium, gold]);
    assert_eq!(db.list(10).await, [premium, gold, silver, plain]);
}

#[rstest]
#[tokio::test]
async fn expired_promotion_lists_by_age() {
    let Some(db) = listing().await else {
        return;
    };
    let expired = db.insert(&db.category, 1, Some((PromotionTier::Premium, -TimeDelta::hours(1))));
    let older = db.insert(&db.category, 3, None);
    let newest = db.insert(&db.category, 0, None);

    assert_eq!(db.list(10).await, [newest, expired, older]);
    assert_eq!(db.list(1).await, [newest]);

    let job = db
        .jobs
        .find_by_id(&expired)
        .await
        .expect("job lookup")
        .expect("job exists");
    let promotion = job.promotion.expect("tag is kept after expiry");
    assert!(!promotion.is_active_at(db.now));
}

#[rstest]
#[tokio::test]
async fn category_filter_excludes_other_categories() {
    let Some(db) = listing().await else {
        return;
    };
    let other_category = format!("{}-other", db.category);
    let inside = db.insert(&db.category, 2, None);
    db.insert(&other_category, 0, Some((PromotionTier::Premium, TimeDelta::days(5))));

    assert_eq!(db.list(10).await, [inside]);
}
