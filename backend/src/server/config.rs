//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;

use gigzz_backend::domain::IdempotencyConfig;
use gigzz_backend::outbound::memory::InMemoryMarketplace;
use gigzz_backend::outbound::persistence::DbPool;

/// Storage the driven ports are wired to.
#[derive(Clone)]
pub enum PersistenceBackend {
    /// PostgreSQL through the pooled Diesel adapters.
    Postgres(DbPool),
    /// Process-local state; balances are lost on restart.
    InMemory(Arc<InMemoryMarketplace>),
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) persistence: PersistenceBackend,
    pub(crate) idempotency: IdempotencyConfig,
}

impl ServerConfig {
    /// Construct a server configuration.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, persistence: PersistenceBackend) -> Self {
        Self {
            bind_addr,
            persistence,
            idempotency: IdempotencyConfig::default(),
        }
    }

    /// Override how long idempotency records are retained.
    #[must_use]
    pub fn with_idempotency(mut self, idempotency: IdempotencyConfig) -> Self {
        self.idempotency = idempotency;
        self
    }
}
