//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

pub mod actor;
pub mod cache_control;
pub mod error;
pub mod health;
pub mod idempotency;
pub mod jobs;
pub mod promotions;
pub mod schemas;
pub mod state;
pub mod validation;
pub mod wallet;

pub use error::ApiResult;

/// Register every `/api/v1` endpoint on a service config.
///
/// # Examples
/// ```no_run
/// use actix_web::{App, web};
/// use gigzz_backend::inbound::http::{configure_api, state::HttpState};
///
/// let _app = App::new()
///     .app_data(web::Data::new(HttpState::fixtures()))
///     .service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(promotions::list_tiers)
        .service(promotions::promote_job)
        .service(jobs::list_jobs)
        .service(jobs::get_job)
        .service(wallet::get_wallet)
        .service(wallet::list_transactions)
        .service(wallet::audit_wallet)
        .service(wallet::top_up);
}
