//! Builders wiring driven adapters into the services behind HTTP state.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use gigzz_backend::domain::ports::{IdempotencyRepository, JobRepository, TokenLedgerRepository};
use gigzz_backend::domain::{IdempotencyConfig, JobQueryService, PromotionService, WalletService};
use gigzz_backend::inbound::http::state::HttpState;
use gigzz_backend::outbound::persistence::{
    DieselIdempotencyRepository, DieselJobRepository, DieselTokenLedgerRepository,
};

use super::{PersistenceBackend, ServerConfig};

/// Wire one set of driven adapters into every driving port.
fn wire_services<L, J, I>(
    ledger: Arc<L>,
    jobs: Arc<J>,
    idempotency: Arc<I>,
    clock: Arc<dyn Clock>,
) -> HttpState
where
    L: TokenLedgerRepository + 'static,
    J: JobRepository + 'static,
    I: IdempotencyRepository + 'static,
{
    let wallet = Arc::new(WalletService::new(
        Arc::clone(&ledger),
        Arc::clone(&idempotency),
        Arc::clone(&clock),
    ));
    let promotions = Arc::new(PromotionService::new(ledger, idempotency, Arc::clone(&clock)));
    let job_query = Arc::new(JobQueryService::new(jobs, clock));
    HttpState::new(promotions, wallet.clone(), wallet, job_query)
}

/// Drop idempotency records older than the configured TTL.
///
/// Failures are logged; a stale record only costs storage.
async fn purge_expired_idempotency<I>(repository: &I, config: IdempotencyConfig)
where
    I: IdempotencyRepository + ?Sized,
{
    match repository.cleanup_expired(config.ttl()).await {
        Ok(removed) => info!(
            removed,
            ttl_secs = config.ttl().as_secs(),
            "purged expired idempotency records"
        ),
        Err(error) => warn!(%error, "idempotency cleanup failed"),
    }
}

/// Build HTTP state for the configured persistence backend.
pub(super) async fn build_http_state(config: &ServerConfig, clock: Arc<dyn Clock>) -> HttpState {
    match &config.persistence {
        PersistenceBackend::Postgres(pool) => {
            let idempotency = Arc::new(DieselIdempotencyRepository::new(
                pool.clone(),
                Arc::clone(&clock),
            ));
            purge_expired_idempotency(idempotency.as_ref(), config.idempotency).await;
            wire_services(
                Arc::new(DieselTokenLedgerRepository::new(pool.clone())),
                Arc::new(DieselJobRepository::new(pool.clone())),
                idempotency,
                clock,
            )
        }
        PersistenceBackend::InMemory(marketplace) => {
            purge_expired_idempotency(marketplace.as_ref(), config.idempotency).await;
            wire_services(
                Arc::clone(marketplace),
                Arc::clone(marketplace),
                Arc::clone(marketplace),
                clock,
            )
        }
    }
}
