//! Domain primitives, rules and services.
//!
//! Purpose: define the strongly typed wallet, ledger, job and promotion model
//! used by the API and persistence layers, and the services that implement
//! the driving ports. Keep types immutable and document invariants and
//! serialisation contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifiers.
//! - Wallet, LedgerEntry, WalletAudit: token balances and their history.
//! - PromotionTier, authorize_promotion: tier catalogue and promotion rules.
//! - Job, JobView, rank_listing: job postings and listing order.
//! - PromotionService, WalletService, JobQueryService: driving port
//!   implementations.

pub mod error;
pub mod idempotency;
pub mod job;
pub mod job_service;
pub mod ports;
pub mod promotion;
pub mod promotion_service;
pub mod tokens;
pub mod trace_id;
pub mod user;
pub mod wallet_service;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::idempotency::{
    IdempotencyConfig, IdempotencyKey, IdempotencyKeyValidationError, IdempotencyLookupQuery,
    IdempotencyLookupResult, IdempotencyRecord, IdempotentMutation, MutationType,
    ParseMutationTypeError, PayloadHash, PayloadHashError, Replayable, canonicalize_and_hash,
};
pub use self::job::{
    DEFAULT_JOB_LIST_LIMIT, Job, JobBuilder, JobId, JobListFilter, JobView, MAX_JOB_LIST_LIMIT,
    rank_listing,
};
pub use self::job_service::JobQueryService;
pub use self::promotion::{
    ParsePromotionTierError, Promotion, PromotionContext, PromotionGrant, PromotionReceipt,
    PromotionRejection, PromotionTier, authorize_promotion,
};
pub use self::promotion_service::PromotionService;
pub use self::tokens::{
    LedgerEntry, LedgerEntryKind, LedgerTotals, MAX_TOKEN_AMOUNT, PAYMENT_REFERENCE_MAX,
    ParseLedgerEntryKindError, PaymentReference, PaymentReferenceError, TokenAmount,
    TokenAmountError, TopUpReceipt, Wallet, WalletAudit,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserIdValidationError};
pub use self::wallet_service::WalletService;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use gigzz_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
