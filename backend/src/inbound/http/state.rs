//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    FixtureJobQuery, FixturePromotionCommand, FixtureWalletCommand, FixtureWalletQuery, JobQuery,
    PromotionCommand, WalletCommand, WalletQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub promotions: Arc<dyn PromotionCommand>,
    pub wallet: Arc<dyn WalletCommand>,
    pub wallet_query: Arc<dyn WalletQuery>,
    pub jobs: Arc<dyn JobQuery>,
}

impl HttpState {
    /// Construct state from the driving ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use gigzz_backend::domain::ports::{
    ///     FixtureJobQuery, FixturePromotionCommand, FixtureWalletCommand, FixtureWalletQuery,
    /// };
    /// use gigzz_backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixturePromotionCommand),
    ///     Arc::new(FixtureWalletCommand),
    ///     Arc::new(FixtureWalletQuery),
    ///     Arc::new(FixtureJobQuery),
    /// );
    /// let _jobs = state.jobs.clone();
    /// ```
    pub fn new(
        promotions: Arc<dyn PromotionCommand>,
        wallet: Arc<dyn WalletCommand>,
        wallet_query: Arc<dyn WalletQuery>,
        jobs: Arc<dyn JobQuery>,
    ) -> Self {
        Self {
            promotions,
            wallet,
            wallet_query,
            jobs,
        }
    }

    /// State backed entirely by fixture ports.
    pub fn fixtures() -> Self {
        Self::new(
            Arc::new(FixturePromotionCommand),
            Arc::new(FixtureWalletCommand),
            Arc::new(FixtureWalletQuery),
            Arc::new(FixtureJobQuery),
        )
    }
}
