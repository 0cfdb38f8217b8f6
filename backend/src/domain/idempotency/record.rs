//! Stored idempotency records and lookup types.

use chrono::{DateTime, TimeDelta, Utc};

use super::super::UserId;
use super::{IdempotencyKey, MutationType, PayloadHash};

/// A stored response keyed by client key, user and operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Client key.
    pub key: IdempotencyKey,
    /// Protected operation.
    pub mutation_type: MutationType,
    /// Hash of the original payload.
    pub payload_hash: PayloadHash,
    /// Response to replay.
    pub response_snapshot: serde_json::Value,
    /// User who made the original request.
    pub user_id: UserId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Whether the record has outlived `ttl` at `now`.
    ///
    /// A record created exactly `ttl` ago is still replayable.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        self.created_at < now - ttl
    }
}

/// Outcome of looking up a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyLookupResult {
    /// No record exists.
    NotFound,
    /// A record exists with the same payload hash.
    MatchingPayload(IdempotencyRecord),
    /// A record exists with a different payload hash.
    ConflictingPayload(IdempotencyRecord),
}

/// Parameters of an idempotency lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyLookupQuery {
    /// Client key.
    pub key: IdempotencyKey,
    /// Requesting user.
    pub user_id: UserId,
    /// Protected operation.
    pub mutation_type: MutationType,
    /// Hash of the incoming payload.
    pub payload_hash: PayloadHash,
}

impl IdempotencyLookupQuery {
    /// Bundle lookup parameters.
    pub fn new(
        key: IdempotencyKey,
        user_id: UserId,
        mutation_type: MutationType,
        payload_hash: PayloadHash,
    ) -> Self {
        Self {
            key,
            user_id,
            mutation_type,
            payload_hash,
        }
    }

    /// Classify a stored record against this query's payload.
    pub fn classify(&self, record: IdempotencyRecord) -> IdempotencyLookupResult {
        if record.payload_hash == self.payload_hash {
            IdempotencyLookupResult::MatchingPayload(record)
        } else {
            IdempotencyLookupResult::ConflictingPayload(record)
        }
    }
}
