//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) are implemented by outbound adapters; driving
//! ports (`*Command`, `*Query`) are implemented by domain services and called
//! by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod idempotency_repository;
mod job_query;
mod job_repository;
mod promotion_command;
mod token_ledger_repository;
mod wallet_command;
mod wallet_query;

#[cfg(test)]
pub use idempotency_repository::MockIdempotencyRepository;
pub use idempotency_repository::{
    FixtureIdempotencyRepository, IdempotencyRepository, IdempotencyRepositoryError,
};
#[cfg(test)]
pub use job_query::MockJobQuery;
pub use job_query::{FixtureJobQuery, JobQuery, ListJobsRequest};
#[cfg(test)]
pub use job_repository::MockJobRepository;
pub use job_repository::{FixtureJobRepository, JobRepository, JobRepositoryError};
#[cfg(test)]
pub use promotion_command::MockPromotionCommand;
pub use promotion_command::{
    FixturePromotionCommand, PromoteJobRequest, PromoteJobResponse, PromotionCommand,
};
#[cfg(test)]
pub use token_ledger_repository::MockTokenLedgerRepository;
pub use token_ledger_repository::{
    CreditOutcome, FixtureTokenLedgerRepository, PromotionOutcome, PromotionSpend,
    TokenLedgerRepository, TokenLedgerRepositoryError, WalletCredit,
};
#[cfg(test)]
pub use wallet_command::MockWalletCommand;
pub use wallet_command::{FixtureWalletCommand, TopUpRequest, TopUpResponse, WalletCommand};
#[cfg(test)]
pub use wallet_query::MockWalletQuery;
pub use wallet_query::{DEFAULT_HISTORY_LIMIT, FixtureWalletQuery, MAX_HISTORY_LIMIT, WalletQuery};
