//! Integration tests for the Diesel ledger adapter against PostgreSQL.
//!
//! Set `GIGZZ_TEST_DATABASE_URL` to a disposable database to run them; the
//! tests skip silently otherwise. Pending migrations are applied first and
//! every test works on fresh random users, so runs do not interfere.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{Text, Timestamptz, Uuid as SqlUuid};
use rstest::rstest;
use uuid::Uuid;

use gigzz_backend::domain::ports::{
    CreditOutcome, JobRepository, PromotionOutcome, PromotionSpend, TokenLedgerRepository,
    WalletCredit,
};
use gigzz_backend::domain::{
    JobId, LedgerEntryKind, PaymentReference, PromotionRejection, PromotionTier, TokenAmount,
    UserId,
};
use gigzz_backend::outbound::persistence::{
    DbPool, DieselJobRepository, DieselTokenLedgerRepository, PoolConfig, run_pending_migrations,
};

const DATABASE_URL_VAR: &str = "GIGZZ_TEST_DATABASE_URL";

struct Database {
    url: String,
    ledger: DieselTokenLedgerRepository,
    jobs: DieselJobRepository,
}

async fn database() -> Option<Database> {
    let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("{DATABASE_URL_VAR} not set; skipping PostgreSQL ledger tests");
        return None;
    };
    run_pending_migrations(&url).await.expect("migrations apply");
    let pool = DbPool::new(PoolConfig::new(&url).with_max_size(4))
        .await
        .expect("pool builds");
    Some(Database {
        url,
        ledger: DieselTokenLedgerRepository::new(pool.clone()),
        jobs: DieselJobRepository::new(pool),
    })
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn insert_job(url: &str, employer: UserId, category: &str) -> JobId {
    let job_id = JobId::random();
    let mut connection = PgConnection::establish(url).expect("connect");
    diesel::sql_query(
        "INSERT INTO jobs (id, employer_id, title, category, min_price, max_price, created_at) \
         VALUES ($1, $2, 'Poster design', $3, 10, 40, $4)",
    )
    .bind::<SqlUuid, _>(*job_id.as_uuid())
    .bind::<SqlUuid, _>(*employer.as_uuid())
    .bind::<Text, _>(category)
    .bind::<Timestamptz, _>(now() - TimeDelta::days(1))
    .execute(&mut connection)
    .expect("insert job");
    job_id
}

fn credit(user_id: UserId, amount: u32, reference: &str) -> WalletCredit {
    WalletCredit {
        user_id,
        amount: TokenAmount::new(amount).expect("valid amount"),
        payment_reference: PaymentReference::new(reference).expect("valid reference"),
        requested_at: now(),
    }
}

fn unique_reference() -> String {
    format!("pay_{}", Uuid::new_v4().simple())
}

#[rstest]
#[tokio::test]
async fn credit_creates_wallet_and_replays_reference() {
    let Some(db) = database().await else {
        return;
    };
    let user = UserId::random();
    let reference = unique_reference();

    let first = db.ledger.credit(&credit(user, 25, &reference)).await.expect("credit");
    let CreditOutcome::Applied(receipt) = first else {
        panic!("first credit applies");
    };
    assert_eq!(receipt.balance_after, 25);

    let second = db.ledger.credit(&credit(user, 25, &reference)).await.expect("credit");
    let CreditOutcome::AlreadyApplied(entry) = second else {
        panic!("reused reference is not applied twice");
    };
    assert_eq!(entry.id, receipt.ledger_entry_id);

    let wallet = db
        .ledger
        .find_wallet(&user)
        .await
        .expect("wallet lookup")
        .expect("wallet exists");
    assert_eq!(wallet.balance, 25);

    let totals = db.ledger.ledger_totals(&user).await.expect("totals");
    assert_eq!(totals.sum, 25);
    assert_eq!(totals.entry_count, 1);
}

#[rstest]
#[tokio::test]
async fn promotion_debits_wallet_and_tags_job() {
    let Some(db) = database().await else {
        return;
    };
    let employer = UserId::random();
    let job_id = insert_job(&db.url, employer, "design");
    db.ledger
        .credit(&credit(employer, 20, &unique_reference()))
        .await
        .expect("credit");

    let requested_at = now();
    let outcome = db
        .ledger
        .apply_promotion(&PromotionSpend {
            job_id,
            tier: PromotionTier::Gold,
            actor: employer,
            requested_at,
        })
        .await
        .expect("promotion");
    let PromotionOutcome::Applied(receipt) = outcome else {
        panic!("promotion applies");
    };
    assert_eq!(receipt.balance_after, 10);
    assert_eq!(receipt.expires_at, requested_at + TimeDelta::days(7));

    let job = db
        .jobs
        .find_by_id(&job_id)
        .await
        .expect("job lookup")
        .expect("job exists");
    let promotion = job.promotion.expect("job carries promotion");
    assert_eq!(promotion.tier, PromotionTier::Gold);

    let entries = db.ledger.list_entries(&employer, 10).await.expect("entries");
    let kinds: Vec<LedgerEntryKind> = entries.iter().map(|entry| entry.kind).collect();
    assert_eq!(
        kinds,
        [LedgerEntryKind::PromotionSpend, LedgerEntryKind::TopUp]
    );

    let again = db
        .ledger
        .apply_promotion(&PromotionSpend {
            job_id,
            tier: PromotionTier::Silver,
            actor: employer,
            requested_at: now(),
        })
        .await
        .expect("second promotion");
    assert!(matches!(
        again,
        PromotionOutcome::Rejected(PromotionRejection::AlreadyPromoted { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn rejected_promotion_leaves_balance_untouched() {
    let Some(db) = database().await else {
        return;
    };
    let employer = UserId::random();
    let job_id = insert_job(&db.url, employer, "writing");
    db.ledger
        .credit(&credit(employer, 4, &unique_reference()))
        .await
        .expect("credit");

    let outcome = db
        .ledger
        .apply_promotion(&PromotionSpend {
            job_id,
            tier: PromotionTier::Silver,
            actor: employer,
            requested_at: now(),
        })
        .await
        .expect("promotion");
    assert_eq!(
        outcome,
        PromotionOutcome::Rejected(PromotionRejection::InsufficientTokens {
            balance: 4,
            cost: 5,
        })
    );

    let stranger = UserId::random();
    let foreign = db
        .ledger
        .apply_promotion(&PromotionSpend {
            job_id,
            tier: PromotionTier::Silver,
            actor: stranger,
            requested_at: now(),
        })
        .await
        .expect("promotion");
    assert_eq!(
        foreign,
        PromotionOutcome::Rejected(PromotionRejection::NotJobOwner { job_id })
    );

    let wallet = db
        .ledger
        .find_wallet(&employer)
        .await
        .expect("wallet lookup")
        .expect("wallet exists");
    assert_eq!(wallet.balance, 4);
}

#[rstest]
#[tokio::test]
async fn concurrent_promotions_spend_once() {
    let Some(db) = database().await else {
        return;
    };
    let employer = UserId::random();
    let job_id = insert_job(&db.url, employer, "design");
    db.ledger
        .credit(&credit(employer, 20, &unique_reference()))
        .await
        .expect("credit");

    let ledger = Arc::new(db.ledger);
    let attempts = (0..4).map(|_| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger
                .apply_promotion(&PromotionSpend {
                    job_id,
                    tier: PromotionTier::Silver,
                    actor: employer,
                    requested_at: now(),
                })
                .await
        })
    });
    let outcomes = futures::future::join_all(attempts).await;
    let applied = outcomes
        .into_iter()
        .map(|joined| joined.expect("task joins").expect("promotion call"))
        .filter(|outcome| matches!(outcome, PromotionOutcome::Applied(_)))
        .count();
    assert_eq!(applied, 1);

    let wallet = ledger
        .find_wallet(&employer)
        .await
        .expect("wallet lookup")
        .expect("wallet exists");
    assert_eq!(wallet.balance, 15);
}

/// Makes every update of `job_id` fail inside the database.
struct FailingJobUpdates {
    url: String,
    name: String,
}

impl FailingJobUpdates {
    fn install(url: &str, job_id: JobId) -> Self {
        let name = format!("reject_job_{}", job_id.as_uuid().simple());
        let mut connection = PgConnection::establish(url).expect("connect");
        connection
            .batch_execute(&format!(
                "CREATE FUNCTION {name}() RETURNS trigger AS $$ \
                 BEGIN \
                   IF NEW.id = '{job}' THEN RAISE EXCEPTION 'job update rejected'; END IF; \
                   RETURN NEW; \
                 END $$ LANGUAGE plpgsql; \
                 CREATE TRIGGER {name} BEFORE UPDATE ON jobs \
                 FOR EACH ROW EXECUTE FUNCTION {name}();",
                job = job_id.as_uuid(),
            ))
            .expect("install trigger");
        Self {
            url: url.to_owned(),
            name,
        }
    }
}

impl Drop for FailingJobUpdates {
    fn drop(&mut self) {
        let name = &self.name;
        if let Ok(mut connection) = PgConnection::establish(&self.url) {
            let _ = connection.batch_execute(&format!(
                "DROP TRIGGER IF EXISTS {name} ON jobs; DROP FUNCTION IF EXISTS {name}();"
            ));
        }
    }
}

#[rstest]
#[tokio::test]
async fn failed_job_update_rolls_back_the_spend() {
    let Some(db) = database().await else {
        return;
    };
    let employer = UserId::random();
    let job_id = insert_job(&db.url, employer, "design");
    db.ledger
        .credit(&credit(employer, 12, &unique_reference()))
        .await
        .expect("credit");
    let _trigger = FailingJobUpdates::install(&db.url, job_id);

    let result = db
        .ledger
        .apply_promotion(&PromotionSpend {
            job_id,
            tier: PromotionTier::Gold,
            actor: employer,
            requested_at: now(),
        })
        .await;
    assert!(result.is_err(), "job update failure surfaces: {result:?}");

    let wallet = db
        .ledger
        .find_wallet(&employer)
        .await
        .expect("wallet lookup")
        .expect("wallet exists");
    assert_eq!(wallet.balance, 12);

    let entries = db.ledger.list_entries(&employer, 10).await.expect("entries");
    let kinds: Vec<LedgerEntryKind> = entries.iter().map(|entry| entry.kind).collect();
    assert_eq!(kinds, [LedgerEntryKind::TopUp]);

    let totals = db.ledger.ledger_totals(&employer).await.expect("totals");
    assert_eq!((totals.sum, totals.entry_count), (12, 1));

    let job = db
        .jobs
        .find_by_id(&job_id)
        .await
        .expect("job lookup")
        .expect("job exists");
    assert!(job.promotion.is_none());
}

#[rstest]
#[tokio::test]
async fn foreign_reference_does_not_open_a_wallet() {
    let Some(db) = database().await else {
        return;
    };
    let owner = UserId::random();
    let reference = unique_reference();
    db.ledger
        .credit(&credit(owner, 10, &reference))
        .await
        .expect("credit");

    let intruder = UserId::random();
    let outcome = db
        .ledger
        .credit(&credit(intruder, 10, &reference))
        .await
        .expect("credit");
    let CreditOutcome::AlreadyApplied(entry) = outcome else {
        panic!("reference already belongs to another wallet");
    };
    assert_eq!(entry.user_id, owner);

    let wallet = db.ledger.find_wallet(&intruder).await.expect("wallet lookup");
    assert!(wallet.is_none());
}
