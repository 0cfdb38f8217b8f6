//! Port for idempotency record persistence.
//!
//! Records survive restarts so a client retrying a promotion or top-up after
//! a crash still receives the original response instead of paying twice.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency repository adapters.
    pub enum IdempotencyRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "idempotency repository connection failed: {message}"; transient,
        /// Query or mutation failed during execution.
        Query { message: String } => "idempotency repository query failed: {message}",
        /// Stored snapshot could not be decoded.
        Serialization { message: String } => "idempotency repository serialization failed: {message}",
        /// A record with this key already exists (concurrent insert race).
        DuplicateKey { message: String } => "idempotency key already exists: {message}",
    }
}

/// Port for idempotency record storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    /// Look up a key scoped to the query's user and mutation type.
    ///
    /// The stored payload hash is compared with the query's hash to tell a
    /// replay from a conflicting reuse of the key.
    async fn lookup(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError>;

    /// Store a record, failing with `DuplicateKey` if one already exists.
    async fn store(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyRepositoryError>;

    /// Remove records older than `ttl`, returning how many were deleted.
    async fn cleanup_expired(&self, ttl: Duration) -> Result<u64, IdempotencyRepositoryError>;
}

/// Fixture that never finds a record and discards stores.
#[derive(Debug, Default)]
pub struct FixtureIdempotencyRepository;

#[async_trait]
impl IdempotencyRepository for FixtureIdempotencyRepository {
    async fn lookup(
        &self,
        _query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError> {
        Ok(IdempotencyLookupResult::NotFound)
    }

    async fn store(&self, _record: &IdempotencyRecord) -> Result<(), IdempotencyRepositoryError> {
        Ok(())
    }

    async fn cleanup_expired(&self, _ttl: Duration) -> Result<u64, IdempotencyRepositoryError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdempotencyKey, MutationType, UserId, canonicalize_and_hash};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn fixture_lookup_returns_not_found_for_every_mutation_type() {
        let repo = FixtureIdempotencyRepository;
        for mutation_type in MutationType::ALL {
            let query = IdempotencyLookupQuery::new(
                IdempotencyKey::random(),
                UserId::random(),
                mutation_type,
                canonicalize_and_hash(&json!({"tier": "Gold"})),
            );
            let result = repo.lookup(&query).await.expect("fixture lookup");
            assert!(
                matches!(result, IdempotencyLookupResult::NotFound),
                "expected NotFound for {mutation_type}"
            );
        }
    }

    #[tokio::test]
    async fn fixture_accepts_records_and_cleans_nothing() {
        let repo = FixtureIdempotencyRepository;
        let record = IdempotencyRecord {
            key: IdempotencyKey::random(),
            mutation_type: MutationType::TopUps,
            payload_hash: canonicalize_and_hash(&json!({"amount": 10})),
            response_snapshot: json!({"balanceAfter": 10}),
            user_id: UserId::random(),
            created_at: Utc::now(),
        };

        repo.store(&record).await.expect("fixture store");
        let deleted = repo
            .cleanup_expired(Duration::from_secs(3600))
            .await
            .expect("fixture cleanup");
        assert_eq!(deleted, 0);
    }

    #[test]
    fn duplicate_key_error_formats_message() {
        let err = IdempotencyRepositoryError::duplicate_key("pk_idempotency_keys");
        assert_eq!(
            err.to_string(),
            "idempotency key already exists: pk_idempotency_keys"
        );
    }
}
