//! Mutex-guarded in-memory implementation of the driven ports.
//!
//! One lock covers wallets, ledger, jobs and idempotency records, so every
//! operation is atomic with respect to every other, matching the transaction
//! guarantees of the PostgreSQL adapters. State is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{
    CreditOutcome, IdempotencyRepository, IdempotencyRepositoryError, JobRepository,
    JobRepositoryError, PromotionOutcome, PromotionSpend, TokenLedgerRepository,
    TokenLedgerRepositoryError, WalletCredit,
};
use crate::domain::{
    IdempotencyKey, IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord, Job,
    JobId, JobListFilter, LedgerEntry, LedgerEntryKind, LedgerTotals, MutationType,
    PromotionContext, PromotionReceipt, TopUpReceipt, UserId, Wallet, authorize_promotion,
    rank_listing,
};

type IdempotencySlot = (IdempotencyKey, UserId, MutationType);

#[derive(Default)]
struct MarketplaceState {
    jobs: HashMap<JobId, Job>,
    wallets: HashMap<UserId, Wallet>,
    ledger: Vec<LedgerEntry>,
    idempotency: HashMap<IdempotencySlot, IdempotencyRecord>,
}

/// In-memory wallets, ledger, jobs and idempotency records.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gigzz_backend::domain::{Job, JobId, UserId};
/// use gigzz_backend::domain::ports::JobRepository;
/// use gigzz_backend::outbound::memory::InMemoryMarketplace;
/// use mockable::DefaultClock;
///
/// # tokio_test_block(async {
/// let job = Job::builder(JobId::random(), UserId::random()).title("Menu design").build();
/// let store = InMemoryMarketplace::new(Arc::new(DefaultClock)).with_jobs([job.clone()]);
/// let found = store.find_by_id(&job.id).await.expect("lookup");
/// assert_eq!(found, Some(job));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(future: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(future)
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryMarketplace {
    state: Arc<Mutex<MarketplaceState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMarketplace {
    /// Empty store; `clock` anchors idempotency expiry.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MarketplaceState::default())),
            clock,
        }
    }

    /// Seed jobs, normally before the store is shared.
    ///
    /// A store already shared with other handles is seeded through the lock;
    /// if another task holds it, the jobs are not stored and a warning is
    /// logged. Use [`Self::upsert_job`] from async code instead.
    pub fn with_jobs(mut self, jobs: impl IntoIterator<Item = Job>) -> Self {
        let seeded = jobs.into_iter().map(|job| (job.id, job));
        if let Some(state) = Arc::get_mut(&mut self.state) {
            state.get_mut().jobs.extend(seeded);
            return self;
        }
        match self.state.try_lock() {
            Ok(mut state) => state.jobs.extend(seeded),
            Err(_) => {
                warn!(jobs = seeded.count(), "store is locked; seed jobs not stored");
            }
        }
        self
    }

    /// Insert or replace a job, as the posting service would.
    pub async fn upsert_job(&self, job: Job) {
        self.state.lock().await.jobs.insert(job.id, job);
    }

    /// Overwrite a stored balance without a ledger entry.
    ///
    /// Only useful for exercising the audit; the ledger no longer sums to
    /// the balance afterwards.
    pub async fn force_balance(&self, user_id: UserId, balance: u64) {
        let now = self.clock.utc();
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::empty(user_id, now));
        wallet.balance = balance;
        wallet.updated_at = now;
    }
}

#[async_trait]
impl TokenLedgerRepository for InMemoryMarketplace {
    async fn find_wallet(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Wallet>, TokenLedgerRepositoryError> {
        Ok(self.state.lock().await.wallets.get(user_id).cloned())
    }

    async fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, TokenLedgerRepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .rev()
            .filter(|entry| entry.user_id == *user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ledger_totals(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerTotals, TokenLedgerRepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .fold(LedgerTotals::default(), |totals, entry| LedgerTotals {
                sum: totals.sum + entry.amount,
                entry_count: totals.entry_count + 1,
            }))
    }

    async fn credit(
        &self,
        credit: &WalletCredit,
    ) -> Result<CreditOutcome, TokenLedgerRepositoryError> {
        let mut state = self.state.lock().await;

        if let Some(entry) = state
            .ledger
            .iter()
            .find(|entry| entry.payment_reference.as_ref() == Some(&credit.payment_reference))
        {
            return Ok(CreditOutcome::AlreadyApplied(entry.clone()));
        }

        let amount = credit.amount.get();
        let wallet = state
            .wallets
            .entry(credit.user_id)
            .or_insert_with(|| Wallet::empty(credit.user_id, credit.requested_at));
        wallet.balance += u64::from(amount);
        wallet.updated_at = credit.requested_at;
        let balance_after = wallet.balance;

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            user_id: credit.user_id,
            kind: LedgerEntryKind::TopUp,
            amount: i64::from(amount),
            balance_after,
            payment_reference: Some(credit.payment_reference.clone()),
            job_id: None,
            promotion_tier: None,
            created_at: credit.requested_at,
        };
        let receipt = TopUpReceipt {
            ledger_entry_id: entry.id,
            user_id: credit.user_id,
            amount,
            balance_after,
            payment_reference: credit.payment_reference.clone(),
            credited_at: credit.requested_at,
        };
        state.ledger.push(entry);
        Ok(CreditOutcome::Applied(receipt))
    }

    async fn apply_promotion(
        &self,
        spend: &PromotionSpend,
    ) -> Result<PromotionOutcome, TokenLedgerRepositoryError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let now = spend.requested_at;

        let wallet_balance = state
            .wallets
            .get(&spend.actor)
            .map_or(0, |wallet| wallet.balance);
        let grant = match authorize_promotion(PromotionContext {
            job_id: spend.job_id,
            job: state.jobs.get(&spend.job_id),
            actor: spend.actor,
            wallet_balance,
            tier: spend.tier,
            now,
        }) {
            Ok(grant) => grant,
            Err(rejection) => return Ok(PromotionOutcome::Rejected(rejection)),
        };

        let (Some(wallet), Some(job)) = (
            state.wallets.get_mut(&spend.actor),
            state.jobs.get_mut(&spend.job_id),
        ) else {
            return Err(TokenLedgerRepositoryError::query(
                "granted promotion without wallet or job",
            ));
        };
        wallet.balance = grant.balance_after;
        wallet.updated_at = now;
        job.promotion = Some(grant.promotion);

        let entry_id = Uuid::new_v4();
        state.ledger.push(LedgerEntry {
            id: entry_id,
            user_id: spend.actor,
            kind: LedgerEntryKind::PromotionSpend,
            amount: grant.ledger_amount(),
            balance_after: grant.balance_after,
            payment_reference: None,
            job_id: Some(spend.job_id),
            promotion_tier: Some(grant.promotion.tier),
            created_at: now,
        });

        Ok(PromotionOutcome::Applied(PromotionReceipt::for_grant(
            &grant, now, entry_id,
        )))
    }
}

#[async_trait]
impl JobRepository for InMemoryMarketplace {
    async fn find_by_id(&self, job_id: &JobId) -> Result<Option<Job>, JobRepositoryError> {
        Ok(self.state.lock().await.jobs.get(job_id).cloned())
    }

    async fn list(&self, filter: &JobListFilter) -> Result<Vec<Job>, JobRepositoryError> {
        let state = self.state.lock().await;
        let jobs = state
            .jobs
            .values()
            .filter(|job| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| job.category == category)
            })
            .cloned()
            .collect();
        Ok(rank_listing(jobs, filter.active_at, filter.limit))
    }
}

#[async_trait]
impl IdempotencyRepository for InMemoryMarketplace {
    async fn lookup(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError> {
        let state = self.state.lock().await;
        let slot = (query.key, query.user_id, query.mutation_type);
        Ok(match state.idempotency.get(&slot) {
            None => IdempotencyLookupResult::NotFound,
            Some(record) => query.classify(record.clone()),
        })
    }

    async fn store(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyRepositoryError> {
        let mut state = self.state.lock().await;
        let slot = (record.key, record.user_id, record.mutation_type);
        if state.idempotency.contains_key(&slot) {
            return Err(IdempotencyRepositoryError::duplicate_key(format!(
                "{} already stored",
                record.key
            )));
        }
        state.idempotency.insert(slot, record.clone());
        Ok(())
    }

    async fn cleanup_expired(&self, ttl: Duration) -> Result<u64, IdempotencyRepositoryError> {
        let ttl = chrono::TimeDelta::from_std(ttl).map_err(|err| {
            IdempotencyRepositoryError::query(format!("invalid TTL duration: {err}"))
        })?;
        let now = self.clock.utc();
        let mut state = self.state.lock().await;
        let before = state.idempotency.len();
        state.idempotency.retain(|_, record| !record.is_expired(now, ttl));
        Ok(u64::try_from(before - state.idempotency.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
#[path = "in_memory_marketplace_tests.rs"]
mod tests;
