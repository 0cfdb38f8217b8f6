//! Cache-control policies shared by handlers.
//!
//! Balances and ledger history change with every top-up or promotion, so
//! wallet responses are never stored by shared or browser caches. Probe
//! responses must always reflect the current process state.

use actix_web::http::header::{self, HeaderName};

/// Per-user wallet data: only the client may hold it, and never reuse it.
pub const WALLET_CACHE_POLICY: &str = "private, no-store";

/// Health probes.
pub const PROBE_CACHE_POLICY: &str = "no-store";

/// Header tuple for responses carrying wallet state.
pub const fn wallet_cache_header() -> (HeaderName, &'static str) {
    (header::CACHE_CONTROL, WALLET_CACHE_POLICY)
}

/// Header tuple for liveness and readiness responses.
pub const fn probe_cache_header() -> (HeaderName, &'static str) {
    (header::CACHE_CONTROL, PROBE_CACHE_POLICY)
}
