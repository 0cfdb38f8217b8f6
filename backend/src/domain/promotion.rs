//! Promotion tiers and the rules for spending tokens on them.
//!
//! [`authorize_promotion`] is a pure function so every adapter evaluates the
//! same rules against state it has already locked. It never mutates anything;
//! the caller applies the returned [`PromotionGrant`] atomically.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Job, JobId, UserId};

/// Fixed promotion tiers.
///
/// | tier    | cost | duration |
/// |---------|------|----------|
/// | Silver  | 5    | 3 days   |
/// | Gold    | 10   | 7 days   |
/// | Premium | 20   | 20 days  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromotionTier {
    /// Entry tier.
    Silver,
    /// Middle tier.
    Gold,
    /// Top tier.
    Premium,
}

impl PromotionTier {
    /// Every tier, cheapest first.
    pub const ALL: [Self; 3] = [Self::Silver, Self::Gold, Self::Premium];

    /// Token cost of the tier.
    pub const fn cost(self) -> u32 {
        match self {
            Self::Silver => 5,
            Self::Gold => 10,
            Self::Premium => 20,
        }
    }

    /// Visibility duration in days.
    pub const fn duration_days(self) -> i64 {
        match self {
            Self::Silver => 3,
            Self::Gold => 7,
            Self::Premium => 20,
        }
    }

    /// Visibility duration.
    pub fn duration(self) -> TimeDelta {
        TimeDelta::days(self.duration_days())
    }

    /// Listing priority; higher ranks are listed first.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Silver => 1,
            Self::Gold => 2,
            Self::Premium => 3,
        }
    }

    /// Tag stored on the job row.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Premium => "Premium",
        }
    }
}

impl fmt::Display for PromotionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown tier name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown promotion tier '{input}': expected Silver, Gold or Premium")]
pub struct ParsePromotionTierError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for PromotionTier {
    type Err = ParsePromotionTierError;

    /// Parse a tier name, ignoring ASCII case.
    ///
    /// # Examples
    /// ```
    /// use gigzz_backend::domain::PromotionTier;
    ///
    /// assert_eq!("gold".parse::<PromotionTier>(), Ok(PromotionTier::Gold));
    /// assert_eq!("PREMIUM".parse::<PromotionTier>(), Ok(PromotionTier::Premium));
    /// assert!("bronze".parse::<PromotionTier>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParsePromotionTierError {
                input: s.to_owned(),
            })
    }
}

/// A promotion applied to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promotion {
    /// Purchased tier.
    pub tier: PromotionTier,
    /// End of the visibility window.
    pub expires_at: DateTime<Utc>,
}

impl Promotion {
    /// A promotion of `tier` bought at `now`.
    pub fn starting_at(tier: PromotionTier, now: DateTime<Utc>) -> Self {
        Self {
            tier,
            expires_at: now + tier.duration(),
        }
    }

    /// A promotion is active strictly before its expiry instant.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Reasons a promotion request is refused without any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromotionRejection {
    /// The job does not exist.
    #[error("job {job_id} not found")]
    JobNotFound {
        /// Requested job.
        job_id: JobId,
    },
    /// The acting user does not own the job.
    #[error("job {job_id} belongs to another employer")]
    NotJobOwner {
        /// Requested job.
        job_id: JobId,
    },
    /// The wallet balance is below the tier cost.
    #[error("insufficient tokens: balance {balance}, cost {cost}")]
    InsufficientTokens {
        /// Current balance.
        balance: u64,
        /// Tier cost.
        cost: u32,
    },
    /// The job already carries an unexpired promotion.
    #[error("job already promoted as {tier} until {expires_at}")]
    AlreadyPromoted {
        /// Current tier.
        tier: PromotionTier,
        /// Current expiry.
        expires_at: DateTime<Utc>,
    },
}

/// State a promotion decision is made against.
#[derive(Debug, Clone, Copy)]
pub struct PromotionContext<'a> {
    /// Requested job id.
    pub job_id: JobId,
    /// The job as currently stored, if it exists.
    pub job: Option<&'a Job>,
    /// The acting user.
    pub actor: UserId,
    /// Current wallet balance (0 when the user has no wallet).
    pub wallet_balance: u64,
    /// Requested tier.
    pub tier: PromotionTier,
    /// Decision time.
    pub now: DateTime<Utc>,
}

/// Changes to apply when a promotion is authorised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionGrant {
    /// Promoted job.
    pub job_id: JobId,
    /// Tokens to deduct.
    pub cost: u32,
    /// Balance after the deduction.
    pub balance_after: u64,
    /// Promotion to set on the job.
    pub promotion: Promotion,
}

impl PromotionGrant {
    /// Signed ledger amount for the spend.
    pub fn ledger_amount(&self) -> i64 {
        -i64::from(self.cost)
    }
}

/// Decide whether a promotion may proceed.
///
/// Checks run in order: the job exists, the actor owns it, the balance covers
/// the tier cost, and the job has no unexpired promotion.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use gigzz_backend::domain::{
///     Job, JobId, PromotionContext, PromotionRejection, PromotionTier, UserId,
///     authorize_promotion,
/// };
///
/// let employer = UserId::random();
/// let now = Utc::now();
/// let job = Job::builder(JobId::random(), employer).created_at(now).build();
/// let decision = authorize_promotion(PromotionContext {
///     job_id: job.id,
///     job: Some(&job),
///     actor: employer,
///     wallet_balance: 8,
///     tier: PromotionTier::Gold,
///     now,
/// });
/// assert_eq!(
///     decision,
///     Err(PromotionRejection::InsufficientTokens { balance: 8, cost: 10 })
/// );
/// ```
pub fn authorize_promotion(
    context: PromotionContext<'_>,
) -> Result<PromotionGrant, PromotionRejection> {
    let PromotionContext {
        job_id,
        job,
        actor,
        wallet_balance,
        tier,
        now,
    } = context;

    let job = job.ok_or(PromotionRejection::JobNotFound { job_id })?;
    if !job.is_owned_by(&actor) {
        return Err(PromotionRejection::NotJobOwner { job_id });
    }

    let cost = tier.cost();
    let balance_after = wallet_balance
        .checked_sub(u64::from(cost))
        .ok_or(PromotionRejection::InsufficientTokens {
            balance: wallet_balance,
            cost,
        })?;

    if let Some(current) = job.active_promotion(now) {
        return Err(PromotionRejection::AlreadyPromoted {
            tier: current.tier,
            expires_at: current.expires_at,
        });
    }

    Ok(PromotionGrant {
        job_id,
        cost,
        balance_after,
        promotion: Promotion::starting_at(tier, now),
    })
}

/// Result of a successful promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionReceipt {
    /// Promoted job.
    pub job_id: JobId,
    /// Purchased tier.
    pub tier: PromotionTier,
    /// Tokens deducted.
    pub tokens_spent: u32,
    /// Wallet balance after the deduction.
    pub balance_after: u64,
    /// Time the promotion started.
    pub promoted_at: DateTime<Utc>,
    /// End of the visibility window.
    pub expires_at: DateTime<Utc>,
    /// Ledger entry recording the spend.
    pub ledger_entry_id: Uuid,
}

impl PromotionReceipt {
    /// Build the receipt for an applied grant.
    pub fn for_grant(
        grant: &PromotionGrant,
        promoted_at: DateTime<Utc>,
        ledger_entry_id: Uuid,
    ) -> Self {
        Self {
            job_id: grant.job_id,
            tier: grant.promotion.tier,
            tokens_spent: grant.cost,
            balance_after: grant.balance_after,
            promoted_at,
            expires_at: grant.promotion.expires_at,
            ledger_entry_id,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Rule coverage for promotion decisions.
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn employer() -> UserId {
        UserId::random()
    }

    fn job_for(employer: UserId, now: DateTime<Utc>, promotion: Option<Promotion>) -> Job {
        Job::builder(JobId::random(), employer)
            .title("Brand film editor")
            .category("video")
            .created_at(now - TimeDelta::days(1))
            .promotion(promotion)
            .build()
    }

    fn decide(
        job: Option<&Job>,
        job_id: JobId,
        actor: UserId,
        balance: u64,
        tier: PromotionTier,
        now: DateTime<Utc>,
    ) -> Result<PromotionGrant, PromotionRejection> {
        authorize_promotion(PromotionContext {
            job_id,
            job,
            actor,
            wallet_balance: balance,
            tier,
            now,
        })
    }

    #[rstest]
    #[case(PromotionTier::Silver, 5, 3)]
    #[case(PromotionTier::Gold, 10, 7)]
    #[case(PromotionTier::Premium, 20, 20)]
    fn tiers_have_fixed_cost_and_duration(
        #[case] tier: PromotionTier,
        #[case] cost: u32,
        #[case] days: i64,
    ) {
        assert_eq!(tier.cost(), cost);
        assert_eq!(tier.duration(), TimeDelta::days(days));
    }

    #[rstest]
    fn silver_with_fifteen_tokens_leaves_ten(now: DateTime<Utc>, employer: UserId) {
        let job = job_for(employer, now, None);
        let grant = decide(Some(&job), job.id, employer, 15, PromotionTier::Silver, now)
            .expect("authorised");

        assert_eq!(grant.balance_after, 10);
        assert_eq!(grant.cost, 5);
        assert_eq!(grant.ledger_amount(), -5);
        assert_eq!(grant.promotion.tier.tag(), "Silver");
        assert_eq!(grant.promotion.expires_at, now + TimeDelta::days(3));
    }

    #[rstest]
    #[case(PromotionTier::Silver, 3)]
    #[case(PromotionTier::Gold, 7)]
    #[case(PromotionTier::Premium, 20)]
    fn expiry_is_request_time_plus_tier_days(
        now: DateTime<Utc>,
        employer: UserId,
        #[case] tier: PromotionTier,
        #[case] days: i64,
    ) {
        let job = job_for(employer, now, None);
        let grant = decide(Some(&job), job.id, employer, 100, tier, now).expect("authorised");
        assert_eq!(grant.promotion.expires_at, now + TimeDelta::days(days));
        assert_eq!(grant.balance_after, 100 - u64::from(tier.cost()));
    }

    #[rstest]
    fn gold_with_eight_tokens_is_refused(now: DateTime<Utc>, employer: UserId) {
        let job = job_for(employer, now, None);
        let decision = decide(Some(&job), job.id, employer, 8, PromotionTier::Gold, now);
        assert_eq!(
            decision,
            Err(PromotionRejection::InsufficientTokens {
                balance: 8,
                cost: 10
            })
        );
    }

    #[rstest]
    fn exact_balance_is_enough(now: DateTime<Utc>, employer: UserId) {
        let job = job_for(employer, now, None);
        let grant = decide(Some(&job), job.id, employer, 20, PromotionTier::Premium, now)
            .expect("authorised");
        assert_eq!(grant.balance_after, 0);
    }

    #[rstest]
    fn unexpired_promotion_is_refused(now: DateTime<Utc>, employer: UserId) {
        let current = Promotion {
            tier: PromotionTier::Gold,
            expires_at: now + TimeDelta::hours(1),
        };
        let job = job_for(employer, now, Some(current));
        let decision = decide(Some(&job), job.id, employer, 50, PromotionTier::Premium, now);
        assert_eq!(
            decision,
            Err(PromotionRejection::AlreadyPromoted {
                tier: PromotionTier::Gold,
                expires_at: current.expires_at,
            })
        );
    }

    #[rstest]
    #[case(TimeDelta::zero())]
    #[case(TimeDelta::days(2))]
    fn expired_promotion_can_be_replaced(
        now: DateTime<Utc>,
        employer: UserId,
        #[case] expired_for: TimeDelta,
    ) {
        let stale = Promotion {
            tier: PromotionTier::Premium,
            expires_at: now - expired_for,
        };
        let job = job_for(employer, now, Some(stale));
        let grant = decide(Some(&job), job.id, employer, 5, PromotionTier::Silver, now)
            .expect("authorised");
        assert_eq!(grant.promotion.tier, PromotionTier::Silver);
    }

    #[rstest]
    fn balance_is_checked_before_existing_promotion(now: DateTime<Utc>, employer: UserId) {
        let current = Promotion::starting_at(PromotionTier::Silver, now);
        let job = job_for(employer, now, Some(current));
        let decision = decide(Some(&job), job.id, employer, 1, PromotionTier::Gold, now);
        assert!(matches!(
            decision,
            Err(PromotionRejection::InsufficientTokens { .. })
        ));
    }

    #[rstest]
    fn missing_job_is_refused(now: DateTime<Utc>, employer: UserId) {
        let job_id = JobId::random();
        let decision = decide(None, job_id, employer, 100, PromotionTier::Silver, now);
        assert_eq!(decision, Err(PromotionRejection::JobNotFound { job_id }));
    }

    #[rstest]
    fn other_employers_cannot_promote(now: DateTime<Utc>, employer: UserId) {
        let job = job_for(employer, now, None);
        let decision = decide(
            Some(&job),
            job.id,
            UserId::random(),
            100,
            PromotionTier::Silver,
            now,
        );
        assert_eq!(
            decision,
            Err(PromotionRejection::NotJobOwner { job_id: job.id })
        );
    }

    #[rstest]
    #[case("silver", PromotionTier::Silver)]
    #[case("Gold", PromotionTier::Gold)]
    #[case("PREMIUM", PromotionTier::Premium)]
    fn tier_names_parse_case_insensitively(#[case] raw: &str, #[case] expected: PromotionTier) {
        assert_eq!(raw.parse::<PromotionTier>(), Ok(expected));
    }

    #[rstest]
    fn receipt_serialises_tier_as_tag(now: DateTime<Utc>, employer: UserId) {
        let job = job_for(employer, now, None);
        let grant = decide(Some(&job), job.id, employer, 15, PromotionTier::Silver, now)
            .expect("authorised");
        let receipt = PromotionReceipt::for_grant(&grant, now, Uuid::nil());
        let value = serde_json::to_value(&receipt).expect("serialise");
        assert_eq!(value["tier"], "Silver");
        assert_eq!(value["tokensSpent"], 5);
        assert_eq!(value["balanceAfter"], 10);
    }
}
