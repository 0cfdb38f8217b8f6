//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every inbound HTTP path, the error schema wrappers and
//! the `X-User-Id` header scheme set by the identity gateway. Swagger UI
//! serves it in debug builds and `openapi-dump` prints it for tooling.

use crate::inbound::http::jobs::{ActivePromotionResponse, JobResponse};
use crate::inbound::http::promotions::{
    PromoteJobBody, PromotionReceiptResponse, PromotionTierResponse,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::wallet::{
    LedgerEntryResponse, TopUpBody, TopUpReceiptResponse, WalletAuditResponse, WalletResponse,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Name of the acting-user security scheme.
pub const ACTING_USER_SCHEME: &str = "ActingUser";

/// Enrich the generated document with the acting-user header scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            ACTING_USER_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-User-Id",
                "Verified user id forwarded by the identity gateway.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Gigzz token wallet API",
        description = "Token wallets, paid job promotions and the promoted job listing."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("ActingUser" = [])),
    paths(
        crate::inbound::http::promotions::list_tiers,
        crate::inbound::http::promotions::promote_job,
        crate::inbound::http::jobs::list_jobs,
        crate::inbound::http::jobs::get_job,
        crate::inbound::http::wallet::get_wallet,
        crate::inbound::http::wallet::list_transactions,
        crate::inbound::http::wallet::audit_wallet,
        crate::inbound::http::wallet::top_up,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PromoteJobBody,
        PromotionTierResponse,
        PromotionReceiptResponse,
        JobResponse,
        ActivePromotionResponse,
        WalletResponse,
        LedgerEntryResponse,
        WalletAuditResponse,
        TopUpBody,
        TopUpReceiptResponse,
    )),
    tags(
        (name = "promotions", description = "Paid job promotions"),
        (name = "jobs", description = "Job listing with promotion status"),
        (name = "wallet", description = "Token balances, history and funding"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_has_wire_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[rstest]
    #[case("/api/v1/promotion-tiers")]
    #[case("/api/v1/jobs/{job_id}/promotion")]
    #[case("/api/v1/jobs")]
    #[case("/api/v1/jobs/{job_id}")]
    #[case("/api/v1/wallet")]
    #[case("/api/v1/wallet/transactions")]
    #[case("/api/v1/wallet/audit")]
    #[case("/api/v1/wallet/top-ups")]
    #[case("/health/ready")]
    #[case("/health/live")]
    fn every_endpoint_is_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn acting_user_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key(ACTING_USER_SCHEME));
    }
}
