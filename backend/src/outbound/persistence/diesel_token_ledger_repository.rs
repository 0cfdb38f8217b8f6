//! PostgreSQL-backed [`TokenLedgerRepository`].
//!
//! Balance changes run in a single transaction that locks the wallet row
//! (`SELECT ... FOR UPDATE`) before anything else, so concurrent requests for
//! the same user serialise. Promotions additionally lock the job row after
//! the wallet; the fixed order avoids deadlocks between the two locks.

use async_trait::async_trait;
use diesel::dsl::{count_star, sql};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    CreditOutcome, PromotionOutcome, PromotionSpend, TokenLedgerRepository,
    TokenLedgerRepositoryError, WalletCredit,
};
use crate::domain::{
    JobId, LedgerEntry, LedgerEntryKind, LedgerTotals, PaymentReference, PromotionContext,
    PromotionReceipt, PromotionTier, TopUpReceipt, UserId, Wallet, authorize_promotion,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation_constraint,
};
use super::diesel_job_repository::job_from_row;
use super::models::{JobRow, LedgerRow, NewLedgerRow, NewWalletRow, WalletRow};
use super::pool::{DbPool, PoolError};
use super::schema::{jobs, token_transactions, token_wallets};

/// Diesel-backed implementation of the [`TokenLedgerRepository`] port.
#[derive(Clone)]
pub struct DieselTokenLedgerRepository {
    pool: DbPool,
}

impl DieselTokenLedgerRepository {
    /// Create a repository backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a ledger transaction.
///
/// Any error rolls the transaction back.
#[derive(Debug)]
enum LedgerTxError {
    Database(diesel::result::Error),
    Corrupt(String),
}

impl From<diesel::result::Error> for LedgerTxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Database(error)
    }
}

fn map_pool_error(error: PoolError) -> TokenLedgerRepositoryError {
    map_basic_pool_error(error, TokenLedgerRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> TokenLedgerRepositoryError {
    map_basic_diesel_error(
        error,
        TokenLedgerRepositoryError::query,
        TokenLedgerRepositoryError::connection,
    )
}

fn map_tx_error(error: LedgerTxError) -> TokenLedgerRepositoryError {
    match error {
        LedgerTxError::Database(error) => map_diesel_error(error),
        LedgerTxError::Corrupt(message) => TokenLedgerRepositoryError::query(message),
    }
}

fn to_column(value: u64) -> Result<i64, LedgerTxError> {
    i64::try_from(value).map_err(|_| LedgerTxError::Corrupt(format!("{value} exceeds BIGINT")))
}

fn from_column(value: i64, what: &str) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("negative {what}: {value}"))
}

fn wallet_from_row(row: WalletRow) -> Result<Wallet, String> {
    Ok(Wallet {
        user_id: UserId::from_uuid(row.user_id),
        balance: from_column(row.balance, "wallet balance")?,
        updated_at: row.updated_at,
    })
}

fn entry_from_row(row: LedgerRow) -> Result<LedgerEntry, String> {
    let kind = row
        .kind
        .parse::<LedgerEntryKind>()
        .map_err(|err| err.to_string())?;
    let payment_reference = row
        .payment_reference
        .map(PaymentReference::new)
        .transpose()
        .map_err(|err| format!("ledger entry {}: {err}", row.id))?;
    let promotion_tier = row
        .promotion_tier
        .as_deref()
        .map(str::parse::<PromotionTier>)
        .transpose()
        .map_err(|err| err.to_string())?;

    Ok(LedgerEntry {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        kind,
        amount: row.amount,
        balance_after: from_column(row.balance_after, "balance_after")?,
        payment_reference,
        job_id: row.job_id.map(JobId::from_uuid),
        promotion_tier,
        created_at: row.created_at,
    })
}

async fn lock_wallet(
    conn: &mut AsyncPgConnection,
    user_id: &Uuid,
) -> Result<Option<WalletRow>, LedgerTxError> {
    let row = token_wallets::table
        .find(user_id)
        .select(WalletRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?;
    Ok(row)
}

async fn find_credit(
    conn: &mut AsyncPgConnection,
    reference: &PaymentReference,
) -> Result<Option<LedgerEntry>, LedgerTxError> {
    let row: Option<LedgerRow> = token_transactions::table
        .filter(token_transactions::payment_reference.eq(reference.as_str()))
        .select(LedgerRow::as_select())
        .first(conn)
        .await
        .optional()?;
    row.map(entry_from_row)
        .transpose()
        .map_err(LedgerTxError::Corrupt)
}

async fn write_balance(
    conn: &mut AsyncPgConnection,
    user_id: &Uuid,
    balance: i64,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<(), LedgerTxError> {
    diesel::update(token_wallets::table.find(user_id))
        .set((
            token_wallets::balance.eq(balance),
            token_wallets::updated_at.eq(at),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

impl DieselTokenLedgerRepository {
    async fn credit_in_tx(
        conn: &mut AsyncPgConnection,
        credit: &WalletCredit,
    ) -> Result<CreditOutcome, LedgerTxError> {
        let user_id = *credit.user_id.as_uuid();
        let at = credit.requested_at;

        // A replayed or foreign reference must not create the caller's wallet.
        if let Some(entry) = find_credit(conn, &credit.payment_reference).await? {
            return Ok(CreditOutcome::AlreadyApplied(entry));
        }

        diesel::insert_into(token_wallets::table)
            .values(&NewWalletRow {
                user_id,
                balance: 0,
                updated_at: at,
            })
            .on_conflict(token_wallets::user_id)
            .do_nothing()
            .execute(conn)
            .await?;
        let wallet = lock_wallet(conn, &user_id)
            .await?
            .ok_or_else(|| LedgerTxError::Corrupt(format!("wallet {user_id} vanished")))?;

        // Same-user credits serialise on the wallet lock; look again.
        if let Some(entry) = find_credit(conn, &credit.payment_reference).await? {
            return Ok(CreditOutcome::AlreadyApplied(entry));
        }

        let amount = i64::from(credit.amount.get());
        let balance_after = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerTxError::Corrupt(format!("wallet {user_id} overflow")))?;
        write_balance(conn, &user_id, balance_after, at).await?;

        let entry_id = Uuid::new_v4();
        diesel::insert_into(token_transactions::table)
            .values(&NewLedgerRow {
                id: entry_id,
                user_id,
                kind: LedgerEntryKind::TopUp.as_str(),
                amount,
                balance_after,
                payment_reference: Some(credit.payment_reference.as_str()),
                job_id: None,
                promotion_tier: None,
                created_at: at,
            })
            .execute(conn)
            .await?;

        Ok(CreditOutcome::Applied(TopUpReceipt {
            ledger_entry_id: entry_id,
            user_id: credit.user_id,
            amount: credit.amount.get(),
            balance_after: from_column(balance_after, "balance").map_err(LedgerTxError::Corrupt)?,
            payment_reference: credit.payment_reference.clone(),
            credited_at: at,
        }))
    }

    async fn promote_in_tx(
        conn: &mut AsyncPgConnection,
        spend: &PromotionSpend,
    ) -> Result<PromotionOutcome, LedgerTxError> {
        let actor = *spend.actor.as_uuid();
        let job_uuid = *spend.job_id.as_uuid();
        let now = spend.requested_at;

        let wallet_balance = match lock_wallet(conn, &actor).await? {
            Some(row) => {
                from_column(row.balance, "wallet balance").map_err(LedgerTxError::Corrupt)?
            }
            None => 0,
        };
        let job_row: Option<JobRow> = jobs::table
            .find(job_uuid)
            .select(JobRow::as_select())
            .for_update()
            .first(conn)
            .await
            .optional()?;
        let job = job_row
            .map(job_from_row)
            .transpose()
            .map_err(LedgerTxError::Corrupt)?;

        let grant = match authorize_promotion(PromotionContext {
            job_id: spend.job_id,
            job: job.as_ref(),
            actor: spend.actor,
            wallet_balance,
            tier: spend.tier,
            now,
        }) {
            Ok(grant) => grant,
            Err(rejection) => return Ok(PromotionOutcome::Rejected(rejection)),
        };

        let balance_after = to_column(grant.balance_after)?;
        write_balance(conn, &actor, balance_after, now).await?;

        let entry_id = Uuid::new_v4();
        diesel::insert_into(token_transactions::table)
            .values(&NewLedgerRow {
                id: entry_id,
                user_id: actor,
                kind: LedgerEntryKind::PromotionSpend.as_str(),
                amount: grant.ledger_amount(),
                balance_after,
                payment_reference: None,
                job_id: Some(job_uuid),
                promotion_tier: Some(grant.promotion.tier.tag()),
                created_at: now,
            })
            .execute(conn)
            .await?;

        diesel::update(jobs::table.find(job_uuid))
            .set((
                jobs::promotion_tag.eq(Some(grant.promotion.tier.tag())),
                jobs::promotion_expires_at.eq(Some(grant.promotion.expires_at)),
            ))
            .execute(conn)
            .await?;

        Ok(PromotionOutcome::Applied(PromotionReceipt::for_grant(
            &grant, now, entry_id,
        )))
    }
}

#[async_trait]
impl TokenLedgerRepository for DieselTokenLedgerRepository {
    async fn find_wallet(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Wallet>, TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<WalletRow> = token_wallets::table
            .find(user_id.as_uuid())
            .select(WalletRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(wallet_from_row)
            .transpose()
            .map_err(TokenLedgerRepositoryError::query)
    }

    async fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<LedgerRow> = token_transactions::table
            .filter(token_transactions::user_id.eq(user_id.as_uuid()))
            .order((
                token_transactions::created_at.desc(),
                token_transactions::id.desc(),
            ))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(LedgerRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| entry_from_row(row).map_err(TokenLedgerRepositoryError::query))
            .collect()
    }

    async fn ledger_totals(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerTotals, TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // SUM(bigint) is NUMERIC in PostgreSQL; cast back so it loads as i64.
        let (sum, count): (i64, i64) = token_transactions::table
            .filter(token_transactions::user_id.eq(user_id.as_uuid()))
            .select((
                sql::<BigInt>("COALESCE(SUM(amount), 0)::BIGINT"),
                count_star(),
            ))
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(LedgerTotals {
            sum,
            entry_count: u64::try_from(count).unwrap_or_default(),
        })
    }

    async fn credit(
        &self,
        credit: &WalletCredit,
    ) -> Result<CreditOutcome, TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<CreditOutcome, LedgerTxError> = conn
            .transaction(|conn| {
                async move { Self::credit_in_tx(conn, credit).await }.scope_boxed()
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            // Another user's transaction committed the same reference first.
            Err(LedgerTxError::Database(error)) if unique_violation_constraint(&error).is_some() => {
                debug!(reference = %credit.payment_reference, "payment reference raced");
                Err(TokenLedgerRepositoryError::duplicate_reference(
                    credit.payment_reference.as_str(),
                ))
            }
            Err(error) => Err(map_tx_error(error)),
        }
    }

    async fn apply_promotion(
        &self,
        spend: &PromotionSpend,
    ) -> Result<PromotionOutcome, TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Result<PromotionOutcome, LedgerTxError> = conn
            .transaction(|conn| {
                async move { Self::promote_in_tx(conn, spend).await }.scope_boxed()
            })
            .await;
        result.map_err(map_tx_error)
    }
}
