//! Driven port for wallet balances and the token ledger.
//!
//! Every balance change goes through this port together with its ledger row
//! in one atomic unit, so the stored balance always equals the sum of the
//! user's ledger amounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    JobId, LedgerEntry, LedgerTotals, PaymentReference, PromotionReceipt, PromotionRejection,
    PromotionTier, TokenAmount, TopUpReceipt, UserId, Wallet,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by token ledger adapters.
    pub enum TokenLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "token ledger connection failed: {message}"; transient,
        /// Query or mutation failed during execution.
        Query { message: String } => "token ledger query failed: {message}",
        /// The payment reference was already credited to a different request.
        DuplicateReference { reference: String } =>
            "payment reference already credited: {reference}",
    }
}

/// Credit requested for a user's wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletCredit {
    /// Wallet owner; the wallet is created on first credit.
    pub user_id: UserId,
    /// Tokens to add.
    pub amount: TokenAmount,
    /// Payment provider reference; credited at most once.
    pub payment_reference: PaymentReference,
    /// Timestamp recorded on the ledger entry.
    pub requested_at: DateTime<Utc>,
}

/// Result of applying a [`WalletCredit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    /// The wallet was credited.
    Applied(TopUpReceipt),
    /// The payment reference had already been credited; nothing changed.
    AlreadyApplied(LedgerEntry),
}

/// Promotion spend requested by an actor for one of their jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionSpend {
    /// Job to promote.
    pub job_id: JobId,
    /// Requested tier; sets both the cost and the duration.
    pub tier: PromotionTier,
    /// Employer paying for the promotion.
    pub actor: UserId,
    /// Start of the promotion window.
    pub requested_at: DateTime<Utc>,
}

/// Result of a promotion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// Tokens were spent and the job now carries the promotion.
    Applied(PromotionReceipt),
    /// A business rule refused the promotion; nothing changed.
    Rejected(PromotionRejection),
}

/// Port for wallet and ledger persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenLedgerRepository: Send + Sync {
    /// Fetch a user's wallet, `None` if it was never created.
    async fn find_wallet(&self, user_id: &UserId)
    -> Result<Option<Wallet>, TokenLedgerRepositoryError>;

    /// Most recent ledger entries for a user, newest first.
    async fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, TokenLedgerRepositoryError>;

    /// Sum and count of a user's ledger entries.
    async fn ledger_totals(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerTotals, TokenLedgerRepositoryError>;

    /// Credit a wallet, creating it on first use.
    ///
    /// Crediting the same payment reference twice is reported as
    /// [`CreditOutcome::AlreadyApplied`] with the original entry.
    async fn credit(
        &self,
        credit: &WalletCredit,
    ) -> Result<CreditOutcome, TokenLedgerRepositoryError>;

    /// Validate and apply a promotion in one atomic unit.
    ///
    /// The wallet and job are locked, the rules are evaluated against the
    /// locked state, and on success the balance is debited, a spend entry is
    /// appended and the job's promotion is set. On rejection nothing changes.
    async fn apply_promotion(
        &self,
        spend: &PromotionSpend,
    ) -> Result<PromotionOutcome, TokenLedgerRepositoryError>;
}

/// Fixture with no wallets and no jobs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTokenLedgerRepository;

#[async_trait]
impl TokenLedgerRepository for FixtureTokenLedgerRepository {
    async fn find_wallet(
        &self,
        _user_id: &UserId,
    ) -> Result<Option<Wallet>, TokenLedgerRepositoryError> {
        Ok(None)
    }

    async fn list_entries(
        &self,
        _user_id: &UserId,
        _limit: usize,
    ) -> Result<Vec<LedgerEntry>, TokenLedgerRepositoryError> {
        Ok(Vec::new())
    }

    async fn ledger_totals(
        &self,
        _user_id: &UserId,
    ) -> Result<LedgerTotals, TokenLedgerRepositoryError> {
        Ok(LedgerTotals::default())
    }

    async fn credit(
        &self,
        credit: &WalletCredit,
    ) -> Result<CreditOutcome, TokenLedgerRepositoryError> {
        let amount = credit.amount.get();
        Ok(CreditOutcome::Applied(TopUpReceipt {
            ledger_entry_id: uuid::Uuid::nil(),
            user_id: credit.user_id,
            amount,
            balance_after: u64::from(amount),
            payment_reference: credit.payment_reference.clone(),
            credited_at: credit.requested_at,
        }))
    }

    async fn apply_promotion(
        &self,
        spend: &PromotionSpend,
    ) -> Result<PromotionOutcome, TokenLedgerRepositoryError> {
        Ok(PromotionOutcome::Rejected(PromotionRejection::JobNotFound {
            job_id: spend.job_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::test_support::fixture_timestamp;

    #[tokio::test]
    async fn fixture_rejects_promotions_for_unknown_jobs() {
        let repo = FixtureTokenLedgerRepository;
        let job_id = JobId::random();
        let outcome = repo
            .apply_promotion(&PromotionSpend {
                job_id,
                tier: PromotionTier::Gold,
                actor: UserId::random(),
                requested_at: fixture_timestamp(),
            })
            .await
            .expect("fixture call");

        assert_eq!(
            outcome,
            PromotionOutcome::Rejected(PromotionRejection::JobNotFound { job_id })
        );
    }

    #[tokio::test]
    async fn fixture_credit_reports_amount_as_balance() {
        let repo = FixtureTokenLedgerRepository;
        let credit = WalletCredit {
            user_id: UserId::random(),
            amount: TokenAmount::new(25).expect("valid amount"),
            payment_reference: PaymentReference::new("pay_1").expect("valid reference"),
            requested_at: fixture_timestamp(),
        };

        let CreditOutcome::Applied(receipt) = repo.credit(&credit).await.expect("fixture call")
        else {
            panic!("fixture always applies credits");
        };
        assert_eq!(receipt.balance_after, 25);
    }

    #[test]
    fn duplicate_reference_error_names_the_reference() {
        let err = TokenLedgerRepositoryError::duplicate_reference("pay_9");
        assert_eq!(err.to_string(), "payment reference already credited: pay_9");
    }
}
