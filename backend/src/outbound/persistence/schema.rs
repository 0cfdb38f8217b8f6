//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `backend/migrations`.
//! `diesel print-schema` against a migrated database regenerates them.

diesel::table! {
    /// Job postings. Owned by the posting service; this backend only reads
    /// them and maintains the promotion columns.
    jobs (id) {
        id -> Uuid,
        employer_id -> Uuid,
        title -> Text,
        category -> Text,
        min_price -> Int8,
        max_price -> Int8,
        deadline -> Nullable<Timestamptz>,
        /// `Silver`, `Gold` or `Premium`; null when never promoted.
        promotion_tag -> Nullable<Text>,
        promotion_expires_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One token balance per user. `balance >= 0` is enforced by a check
    /// constraint.
    token_wallets (user_id) {
        user_id -> Uuid,
        balance -> Int8,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only token ledger. Rows are never updated or deleted.
    token_transactions (id) {
        id -> Uuid,
        user_id -> Uuid,
        /// `top_up` or `promotion_spend`.
        kind -> Text,
        /// Signed token delta; never zero.
        amount -> Int8,
        balance_after -> Int8,
        /// Unique when present.
        payment_reference -> Nullable<Text>,
        job_id -> Nullable<Uuid>,
        promotion_tier -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Stored responses for idempotent mutations.
    idempotency_keys (key, user_id, mutation_type) {
        key -> Uuid,
        user_id -> Uuid,
        mutation_type -> Text,
        payload_hash -> Bytea,
        response_snapshot -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(token_transactions -> token_wallets (user_id));

diesel::allow_tables_to_appear_in_same_query!(jobs, token_wallets, token_transactions, idempotency_keys);
