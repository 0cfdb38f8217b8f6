//! Gigzz token wallet and job promotion backend.
//!
//! Layout follows ports and adapters: [`domain`] holds the wallet, ledger,
//! promotion and job model plus the services behind the driving ports;
//! [`inbound`] adapts HTTP requests onto those ports; [`outbound`] implements
//! the driven ports over PostgreSQL or in memory.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
