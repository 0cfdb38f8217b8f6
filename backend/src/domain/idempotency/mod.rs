//! Idempotency primitives for safe retries of token-moving requests.
//!
//! - [`IdempotencyKey`]: client UUID from the `Idempotency-Key` header.
//! - [`PayloadHash`]: SHA-256 of the canonicalised request payload, so a key
//!   reused with a different body is detected.
//! - [`IdempotencyRecord`] / [`IdempotencyLookupResult`]: stored responses and
//!   lookup outcomes.
//! - [`MutationType`]: scopes keys per operation.
//! - [`IdempotencyConfig`]: record retention.
//! - [`IdempotentMutation`]: the lookup, perform, store and replay flow shared
//!   by the promotion and wallet services.
//!
//! Canonicalisation sorts object keys recursively and serialises compact
//! JSON before hashing.

mod config;
mod key;
mod mutation;
mod mutation_type;
mod payload;
mod record;

pub use config::IdempotencyConfig;
pub use key::{IdempotencyKey, IdempotencyKeyValidationError};
pub use mutation::{IdempotentMutation, Replayable};
pub use mutation_type::{MutationType, ParseMutationTypeError};
pub use payload::{PayloadHash, PayloadHashError, canonicalize_and_hash};
pub use record::{IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord};
