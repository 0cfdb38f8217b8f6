//! Lookup, perform, store and replay flow for idempotent mutations.

use std::future::Future;

use mockable::Clock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::ports::{IdempotencyRepository, IdempotencyRepositoryError};

use super::{IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord};

/// Responses that can be stored and replayed.
pub trait Replayable: Serialize + DeserializeOwned + Send {
    /// Flag a response as served from a stored snapshot.
    fn mark_replayed(self) -> Self;
}

/// One idempotent execution of a mutation.
///
/// A first request performs the mutation and stores its response. A retry
/// with the same key and payload replays the stored response; a retry with a
/// different payload is a conflict. When two first requests race, the loser
/// of the insert re-reads the winner's record.
pub struct IdempotentMutation<'a, I: ?Sized> {
    repository: &'a I,
    clock: &'a dyn Clock,
    query: IdempotencyLookupQuery,
}

impl<'a, I> IdempotentMutation<'a, I>
where
    I: IdempotencyRepository + ?Sized,
{
    /// Prepare an execution for `query`.
    pub fn new(repository: &'a I, clock: &'a dyn Clock, query: IdempotencyLookupQuery) -> Self {
        Self {
            repository,
            clock,
            query,
        }
    }

    /// Run `perform` unless a stored response already answers the request.
    pub async fn run<T, F, Fut>(self, perform: F) -> Result<T, Error>
    where
        T: Replayable,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, Error>> + Send,
    {
        let lookup = self
            .repository
            .lookup(&self.query)
            .await
            .map_err(map_idempotency_error)?;

        match lookup {
            IdempotencyLookupResult::NotFound => {
                let response = perform().await?;
                self.store(response).await
            }
            IdempotencyLookupResult::MatchingPayload(record) => replay(record),
            IdempotencyLookupResult::ConflictingPayload(_) => Err(key_reused_error()),
        }
    }

    async fn store<T: Replayable>(&self, response: T) -> Result<T, Error> {
        let response_snapshot = serde_json::to_value(&response)
            .map_err(|err| Error::internal(format!("failed to serialise response: {err}")))?;
        let record = IdempotencyRecord {
            key: self.query.key,
            mutation_type: self.query.mutation_type,
            payload_hash: self.query.payload_hash.clone(),
            response_snapshot,
            user_id: self.query.user_id,
            created_at: self.clock.utc(),
        };

        match self.repository.store(&record).await {
            Ok(()) => Ok(response),
            Err(IdempotencyRepositoryError::DuplicateKey { .. }) => self.resolve_race().await,
            Err(err) => {
                // The mutation is already committed; a retry is still caught
                // by the domain rules, so the response wins over the snapshot.
                warn!(
                    error = %err,
                    key = %self.query.key,
                    mutation = %self.query.mutation_type,
                    "failed to store idempotency record"
                );
                Ok(response)
            }
        }
    }

    async fn resolve_race<T: Replayable>(&self) -> Result<T, Error> {
        debug!(key = %self.query.key, "idempotency insert raced; re-reading record");
        let retry = self
            .repository
            .lookup(&self.query)
            .await
            .map_err(map_idempotency_error)?;

        match retry {
            IdempotencyLookupResult::MatchingPayload(record) => replay(record),
            IdempotencyLookupResult::ConflictingPayload(_) => Err(key_reused_error()),
            IdempotencyLookupResult::NotFound => Err(Error::internal(
                "idempotency record disappeared during race resolution",
            )),
        }
    }
}

fn replay<T: Replayable>(record: IdempotencyRecord) -> Result<T, Error> {
    serde_json::from_value::<T>(record.response_snapshot)
        .map(Replayable::mark_replayed)
        .map_err(|err| Error::internal(format!("failed to deserialise stored response: {err}")))
}

fn key_reused_error() -> Error {
    Error::conflict("idempotency key already used with a different payload").with_details(
        serde_json::json!({
            "code": "idempotency_key_reused",
        }),
    )
}

/// Map idempotency store failures to domain errors.
pub(crate) fn map_idempotency_error(error: IdempotencyRepositoryError) -> Error {
    match error {
        IdempotencyRepositoryError::DuplicateKey { message } => {
            Error::internal(format!("unexpected idempotency key conflict: {message}"))
        }
        other if other.is_transient() => Error::service_unavailable(other.to_string()),
        other => Error::internal(other.to_string()),
    }
}
