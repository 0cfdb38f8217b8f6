//! In-process adapters used when no database is configured, and by tests.

mod in_memory_marketplace;

pub use in_memory_marketplace::InMemoryMarketplace;
