//! PostgreSQL-backed [`IdempotencyRepository`].
//!
//! Lookups do not filter by age; expired records are purged by
//! `cleanup_expired`, which the server runs at startup.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{IdempotencyRepository, IdempotencyRepositoryError};
use crate::domain::{
    IdempotencyKey, IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord,
    MutationType, PayloadHash, UserId,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation_constraint,
};
use super::models::{IdempotencyKeyRow, NewIdempotencyKeyRow};
use super::pool::{DbPool, PoolError};
use super::schema::idempotency_keys;

/// Diesel-backed implementation of the [`IdempotencyRepository`] port.
#[derive(Clone)]
pub struct DieselIdempotencyRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselIdempotencyRepository {
    /// Create a repository; `clock` anchors the TTL cutoff.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn map_pool_error(error: PoolError) -> IdempotencyRepositoryError {
    map_basic_pool_error(error, IdempotencyRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> IdempotencyRepositoryError {
    if unique_violation_constraint(&error).is_some() {
        return IdempotencyRepositoryError::duplicate_key("concurrent insert detected");
    }
    map_basic_diesel_error(
        error,
        IdempotencyRepositoryError::query,
        IdempotencyRepositoryError::connection,
    )
}

fn row_to_record(row: IdempotencyKeyRow) -> Result<IdempotencyRecord, IdempotencyRepositoryError> {
    let payload_hash = PayloadHash::try_from_bytes(&row.payload_hash).map_err(|err| {
        IdempotencyRepositoryError::serialization(format!("corrupted payload hash: {err}"))
    })?;
    let mutation_type = MutationType::from_str(&row.mutation_type).map_err(|err| {
        IdempotencyRepositoryError::serialization(format!("invalid mutation type: {err}"))
    })?;

    Ok(IdempotencyRecord {
        key: IdempotencyKey::from_uuid(row.key),
        mutation_type,
        payload_hash,
        response_snapshot: row.response_snapshot,
        user_id: UserId::from_uuid(row.user_id),
        created_at: row.created_at,
    })
}

#[async_trait]
impl IdempotencyRepository for DieselIdempotencyRepository {
    async fn lookup(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<IdempotencyKeyRow> = idempotency_keys::table
            .filter(idempotency_keys::key.eq(query.key.as_uuid()))
            .filter(idempotency_keys::user_id.eq(query.user_id.as_uuid()))
            .filter(idempotency_keys::mutation_type.eq(query.mutation_type.as_str()))
            .select(IdempotencyKeyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match row {
            None => Ok(IdempotencyLookupResult::NotFound),
            Some(row) => Ok(query.classify(row_to_record(row)?)),
        }
    }

    async fn store(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let new_record = NewIdempotencyKeyRow {
            key: *record.key.as_uuid(),
            user_id: *record.user_id.as_uuid(),
            mutation_type: record.mutation_type.as_str(),
            payload_hash: record.payload_hash.as_bytes(),
            response_snapshot: &record.response_snapshot,
            created_at: record.created_at,
        };

        diesel::insert_into(idempotency_keys::table)
            .values(&new_record)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn cleanup_expired(&self, ttl: Duration) -> Result<u64, IdempotencyRepositoryError> {
        let ttl = chrono::TimeDelta::from_std(ttl).map_err(|err| {
            IdempotencyRepositoryError::query(format!("invalid TTL duration: {err}"))
        })?;
        let cutoff = self.clock.utc() - ttl;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(idempotency_keys::table)
            .filter(idempotency_keys::created_at.lt(cutoff))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(deleted, cutoff = %cutoff, "cleaned up expired idempotency records");
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(repo_err, IdempotencyRepositoryError::Connection { .. }));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn unique_violation_maps_to_duplicate_key() {
        let diesel_err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        );

        assert!(matches!(
            map_diesel_error(diesel_err),
            IdempotencyRepositoryError::DuplicateKey { .. }
        ));
    }

    #[rstest]
    fn corrupted_hash_is_a_serialization_error() {
        let row = IdempotencyKeyRow {
            key: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            mutation_type: "promotions".to_owned(),
            payload_hash: vec![0; 4],
            response_snapshot: serde_json::json!({}),
            created_at: chrono::Utc::now(),
        };

        assert!(matches!(
            row_to_record(row),
            Err(IdempotencyRepositoryError::Serialization { .. })
        ));
    }
}
