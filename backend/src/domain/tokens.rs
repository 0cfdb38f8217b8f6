//! Token wallets and the append-only token ledger.
//!
//! A wallet's stored balance is a cache of its ledger: every movement of
//! tokens appends a signed [`LedgerEntry`] in the same transaction that
//! updates the balance, so [`WalletAudit`] can always re-derive it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{JobId, PromotionTier, UserId};

/// Largest number of tokens a single top-up may credit.
pub const MAX_TOKEN_AMOUNT: u32 = 100_000;

/// Longest accepted payment reference.
pub const PAYMENT_REFERENCE_MAX: usize = 128;

/// Validation errors for [`TokenAmount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenAmountError {
    /// Zero tokens is not a movement.
    #[error("token amount must be positive")]
    Zero,
    /// The amount exceeds [`MAX_TOKEN_AMOUNT`].
    #[error("token amount must be at most {max}")]
    TooLarge {
        /// Upper bound.
        max: u32,
    },
}

/// A strictly positive number of tokens.
///
/// # Examples
/// ```
/// use gigzz_backend::domain::TokenAmount;
///
/// assert_eq!(TokenAmount::new(25).expect("valid").get(), 25);
/// assert!(TokenAmount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TokenAmount(u32);

impl TokenAmount {
    /// Validate an amount.
    pub fn new(amount: u32) -> Result<Self, TokenAmountError> {
        match amount {
            0 => Err(TokenAmountError::Zero),
            value if value > MAX_TOKEN_AMOUNT => Err(TokenAmountError::TooLarge {
                max: MAX_TOKEN_AMOUNT,
            }),
            value => Ok(Self(value)),
        }
    }

    /// Number of tokens.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for TokenAmount {
    type Error = TokenAmountError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TokenAmount> for u32 {
    fn from(value: TokenAmount) -> Self {
        value.0
    }
}

/// Validation errors for [`PaymentReference`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentReferenceError {
    /// The reference was empty.
    #[error("payment reference must not be empty")]
    Empty,
    /// The reference exceeded [`PAYMENT_REFERENCE_MAX`] characters.
    #[error("payment reference must be at most {max} characters")]
    TooLong {
        /// Upper bound.
        max: usize,
    },
    /// The reference contained whitespace or non-printable characters.
    #[error("payment reference may only contain visible ASCII characters")]
    InvalidCharacters,
}

/// Reference issued by the payment gateway for a completed payment.
///
/// Unique across the ledger, so a payment can credit a wallet at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Validate a gateway reference.
    ///
    /// # Examples
    /// ```
    /// use gigzz_backend::domain::PaymentReference;
    ///
    /// assert!(PaymentReference::new("PSK_7f3a91").is_ok());
    /// assert!(PaymentReference::new("has space").is_err());
    /// ```
    pub fn new(reference: impl Into<String>) -> Result<Self, PaymentReferenceError> {
        let reference = reference.into();
        if reference.is_empty() {
            return Err(PaymentReferenceError::Empty);
        }
        if reference.chars().count() > PAYMENT_REFERENCE_MAX {
            return Err(PaymentReferenceError::TooLong {
                max: PAYMENT_REFERENCE_MAX,
            });
        }
        if !reference.chars().all(|c| c.is_ascii_graphic()) {
            return Err(PaymentReferenceError::InvalidCharacters);
        }
        Ok(Self(reference))
    }

    /// Borrow the reference.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PaymentReference {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = PaymentReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self {
        value.0
    }
}

/// A user's token wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    /// Owner of the wallet.
    pub user_id: UserId,
    /// Current balance; never negative.
    pub balance: u64,
    /// Time of the last balance change.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// The wallet a user has before their first top-up.
    pub fn empty(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: 0,
            updated_at: at,
        }
    }
}

/// Kind of ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Tokens bought through the payment gateway (positive amount).
    TopUp,
    /// Tokens spent promoting a job (negative amount).
    PromotionSpend,
}

impl LedgerEntryKind {
    /// Database and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopUp => "top_up",
            Self::PromotionSpend => "promotion_spend",
        }
    }
}

impl fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown ledger kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ledger entry kind '{input}'")]
pub struct ParseLedgerEntryKindError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for LedgerEntryKind {
    type Err = ParseLedgerEntryKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_up" => Ok(Self::TopUp),
            "promotion_spend" => Ok(Self::PromotionSpend),
            other => Err(ParseLedgerEntryKindError {
                input: other.to_owned(),
            }),
        }
    }
}

/// One signed movement of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// Wallet owner.
    pub user_id: UserId,
    /// Movement kind.
    pub kind: LedgerEntryKind,
    /// Signed token delta: positive for credits, negative for spends.
    pub amount: i64,
    /// Wallet balance immediately after this entry.
    pub balance_after: u64,
    /// Gateway reference for top-ups.
    pub payment_reference: Option<PaymentReference>,
    /// Promoted job for promotion spends.
    pub job_id: Option<JobId>,
    /// Purchased tier for promotion spends.
    pub promotion_tier: Option<PromotionTier>,
    /// Time the movement was recorded.
    pub created_at: DateTime<Utc>,
}

/// Aggregate of a wallet's ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Sum of all signed amounts.
    pub sum: i64,
    /// Number of entries.
    pub entry_count: u64,
}

/// Comparison of a wallet's stored balance against its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAudit {
    /// Wallet owner.
    pub user_id: UserId,
    /// Balance held on the wallet row.
    pub stored_balance: u64,
    /// Balance derived from the ledger.
    pub ledger_balance: i64,
    /// Number of ledger entries.
    pub entry_count: u64,
    /// `stored_balance - ledger_balance`; zero when consistent.
    pub drift: i64,
}

impl WalletAudit {
    /// Reconcile a stored balance against ledger totals.
    ///
    /// # Examples
    /// ```
    /// use gigzz_backend::domain::{LedgerTotals, UserId, WalletAudit};
    ///
    /// let totals = LedgerTotals { sum: 10, entry_count: 2 };
    /// let audit = WalletAudit::reconcile(UserId::random(), 10, totals);
    /// assert!(audit.is_consistent());
    /// ```
    pub fn reconcile(user_id: UserId, stored_balance: u64, totals: LedgerTotals) -> Self {
        let stored = i64::try_from(stored_balance).unwrap_or(i64::MAX);
        Self {
            user_id,
            stored_balance,
            ledger_balance: totals.sum,
            entry_count: totals.entry_count,
            drift: stored.saturating_sub(totals.sum),
        }
    }

    /// Whether the stored balance equals the ledger sum.
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

/// Outcome of crediting a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpReceipt {
    /// Ledger entry recording the credit.
    pub ledger_entry_id: Uuid,
    /// Credited wallet.
    pub user_id: UserId,
    /// Tokens credited.
    pub amount: u32,
    /// Balance after the credit.
    pub balance_after: u64,
    /// Gateway reference that paid for the tokens.
    pub payment_reference: PaymentReference,
    /// Time of the credit.
    pub credited_at: DateTime<Utc>,
}

impl TopUpReceipt {
    /// Rebuild the receipt of an earlier credit from its ledger entry.
    ///
    /// Returns `None` for entries that are not top-ups.
    pub fn from_entry(entry: &LedgerEntry) -> Option<Self> {
        if entry.kind != LedgerEntryKind::TopUp {
            return None;
        }
        Some(Self {
            ledger_entry_id: entry.id,
            user_id: entry.user_id,
            amount: u32::try_from(entry.amount).ok()?,
            balance_after: entry.balance_after,
            payment_reference: entry.payment_reference.clone()?,
            credited_at: entry.created_at,
        })
    }
}
