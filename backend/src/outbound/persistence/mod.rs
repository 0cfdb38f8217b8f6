//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Adapters only translate between Diesel rows and domain types; the rules
//! they apply inside transactions come from the domain. Row structs
//! (`models.rs`) and table definitions (`schema.rs`) never leave this module.
//!
//! # Example
//!
//! ```no_run
//! use gigzz_backend::outbound::persistence::{DbPool, DieselTokenLedgerRepository, PoolConfig};
//!
//! # async fn connect() -> Result<(), gigzz_backend::outbound::persistence::PoolError> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/gigzz")).await?;
//! let ledger = DieselTokenLedgerRepository::new(pool);
//! # let _ = ledger;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_idempotency_repository;
mod diesel_job_repository;
mod diesel_token_ledger_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_idempotency_repository::DieselIdempotencyRepository;
pub use diesel_job_repository::DieselJobRepository;
pub use diesel_token_ledger_repository::DieselTokenLedgerRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
