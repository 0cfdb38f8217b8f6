//! Outbound adapters implementing the driven ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel ORM.
//! - **memory**: in-process store used without a database and in tests.
//!
//! Adapters translate between domain types and storage representations; the
//! promotion rules they run inside transactions come from the domain.

pub mod memory;
pub mod persistence;
