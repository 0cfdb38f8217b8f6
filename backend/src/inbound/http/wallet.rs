//! Token wallet HTTP handlers.
//!
//! ```text
//! GET  /api/v1/wallet
//! GET  /api/v1/wallet/transactions?limit=
//! GET  /api/v1/wallet/audit
//! POST /api/v1/wallet/top-ups
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{DEFAULT_HISTORY_LIMIT, TopUpRequest, TopUpResponse};
use crate::domain::{Error, LedgerEntry, PaymentReference, TokenAmount, Wallet, WalletAudit};
use crate::inbound::http::ApiResult;
use crate::inbound::http::actor::ActingUser;
use crate::inbound::http::cache_control::wallet_cache_header;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_payment_reference, parse_token_amount,
};

const AMOUNT: FieldName = FieldName::new("amount");
const PAYMENT_REFERENCE: FieldName = FieldName::new("paymentReference");

/// Current wallet balance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub user_id: String,
    #[schema(example = 25)]
    pub balance: u64,
    pub updated_at: String,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            user_id: wallet.user_id.to_string(),
            balance: wallet.balance,
            updated_at: wallet.updated_at.to_rfc3339(),
        }
    }
}

/// One ledger row, newest first in listings.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub id: String,
    /// `top_up` or `promotion_spend`.
    #[schema(example = "promotion_spend")]
    pub kind: String,
    /// Signed token movement; spends are negative.
    #[schema(example = -10)]
    pub amount: i64,
    pub balance_after: u64,
    pub payment_reference: Option<String>,
    pub job_id: Option<String>,
    pub promotion_tier: Option<String>,
    pub created_at: String,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            kind: entry.kind.as_str().to_owned(),
            amount: entry.amount,
            balance_after: entry.balance_after,
            payment_reference: entry.payment_reference.map(|reference| reference.to_string()),
            job_id: entry.job_id.map(|id| id.to_string()),
            promotion_tier: entry.promotion_tier.map(|tier| tier.tag().to_owned()),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Reconciliation of the stored balance against the ledger.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuditResponse {
    pub user_id: String,
    pub stored_balance: u64,
    pub ledger_balance: i64,
    pub entry_count: u64,
    pub drift: i64,
    pub consistent: bool,
}

impl From<WalletAudit> for WalletAuditResponse {
    fn from(audit: WalletAudit) -> Self {
        Self {
            consistent: audit.is_consistent(),
            user_id: audit.user_id.to_string(),
            stored_balance: audit.stored_balance,
            ledger_balance: audit.ledger_balance,
            entry_count: audit.entry_count,
            drift: audit.drift,
        }
    }
}

/// Query parameters for the transaction history.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Page size, 1 to 100 (default 20).
    pub limit: Option<usize>,
}

/// Request payload for crediting a completed payment.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpBody {
    #[schema(example = 25)]
    pub amount: Option<i64>,
    #[schema(example = "PSK_7f3a91")]
    pub payment_reference: Option<String>,
}

/// Receipt for a credited payment.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpReceiptResponse {
    pub ledger_entry_id: String,
    pub amount: u32,
    pub balance_after: u64,
    pub payment_reference: String,
    pub credited_at: String,
    /// True when the payment had already been credited.
    pub replayed: bool,
}

impl From<TopUpResponse> for TopUpReceiptResponse {
    fn from(value: TopUpResponse) -> Self {
        let TopUpResponse { receipt, replayed } = value;
        Self {
            ledger_entry_id: receipt.ledger_entry_id.to_string(),
            amount: receipt.amount,
            balance_after: receipt.balance_after,
            payment_reference: receipt.payment_reference.to_string(),
            credited_at: receipt.credited_at.to_rfc3339(),
            replayed,
        }
    }
}

fn parse_top_up_body(body: TopUpBody) -> Result<(TokenAmount, PaymentReference), Error> {
    let amount = body.amount.ok_or_else(|| missing_field_error(AMOUNT))?;
    let reference = body
        .payment_reference
        .ok_or_else(|| missing_field_error(PAYMENT_REFERENCE))?;
    Ok((
        parse_token_amount(amount, AMOUNT)?,
        parse_payment_reference(reference, PAYMENT_REFERENCE)?,
    ))
}

/// Fetch the acting user's balance.
#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    responses(
        (
            status = 200,
            description = "Wallet balance",
            headers(("Cache-Control" = String, description = "Cache control header")),
            body = WalletResponse
        ),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "getWallet"
)]
#[get("/wallet")]
pub async fn get_wallet(
    state: web::Data<HttpState>,
    actor: ActingUser,
) -> ApiResult<HttpResponse> {
    let wallet = state.wallet_query.wallet(&actor.id()).await?;
    Ok(HttpResponse::Ok()
        .insert_header(wallet_cache_header())
        .json(WalletResponse::from(wallet)))
}

/// List the acting user's ledger entries, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Ledger entries", body = [LedgerEntryResponse]),
        (status = 400, description = "Invalid limit", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "listWalletTransactions"
)]
#[get("/wallet/transactions")]
pub async fn list_transactions(
    state: web::Data<HttpState>,
    actor: ActingUser,
    query: web::Query<HistoryQuery>,
) -> ApiResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let entries = state.wallet_query.history(&actor.id(), limit).await?;
    let body: Vec<LedgerEntryResponse> =
        entries.into_iter().map(LedgerEntryResponse::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(wallet_cache_header())
        .json(body))
}

/// Reconcile the acting user's balance with the ledger.
#[utoipa::path(
    get,
    path = "/api/v1/wallet/audit",
    responses(
        (status = 200, description = "Wallet audit", body = WalletAuditResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "auditWallet"
)]
#[get("/wallet/audit")]
pub async fn audit_wallet(
    state: web::Data<HttpState>,
    actor: ActingUser,
) -> ApiResult<HttpResponse> {
    let audit = state.wallet_query.audit(&actor.id()).await?;
    Ok(HttpResponse::Ok()
        .insert_header(wallet_cache_header())
        .json(WalletAuditResponse::from(audit)))
}

/// Credit a completed payment to the acting user's wallet.
#[utoipa::path(
    post,
    path = "/api/v1/wallet/top-ups",
    request_body = TopUpBody,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "UUID for idempotent requests")
    ),
    responses(
        (status = 201, description = "Tokens credited", body = TopUpReceiptResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 409, description = "Payment reference or idempotency key reused", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "topUpWallet"
)]
#[post("/wallet/top-ups")]
pub async fn top_up(
    state: web::Data<HttpState>,
    actor: ActingUser,
    request: HttpRequest,
    payload: web::Json<TopUpBody>,
) -> ApiResult<HttpResponse> {
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let (amount, payment_reference) = parse_top_up_body(payload.into_inner())?;

    let response = state
        .wallet
        .top_up(TopUpRequest {
            user_id: actor.id(),
            amount,
            payment_reference,
            idempotency_key,
        })
        .await?;

    Ok(HttpResponse::Created().json(TopUpReceiptResponse::from(response)))
}

#[cfg(test)]
#[path = "wallet_tests.rs"]
mod tests;
