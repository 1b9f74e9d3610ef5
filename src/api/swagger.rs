use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::services::auth_service::{OAUTH_COOKIE, SESSION_COOKIE};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Koperasi Service API",
        version = "1.0.0",
        description = "Backend for the cooperative dashboard. Every collection is one sheet of a Google Sheets spreadsheet.\n\n**Authentication:** data routes need the `user_session` cookie (password login) or the `google_tokens` cookie (Google OAuth), depending on `AUTH_MODE`.\n\n**Features:**\n- Members, Savings, Products, Transactions, Inventory and Users collections\n- Schema bootstrap and demo data\n- Health monitoring and metrics"
    ),
    paths(
        // Auth endpoints
        crate::api::auth::login,
        crate::api::auth::status,
        crate::api::auth::logout,
        crate::api::auth::auth_url,

        // Sheets
        crate::api::sheets::list_records,
        crate::api::sheets::create_record,
        crate::api::sheets::update_record,
        crate::api::sheets::delete_record,
        crate::api::sheets::init_sheets,
        crate::api::sheets::seed_sheets,
        crate::api::sheets::suggest_id,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::LoginResponse,
            crate::services::auth_service::AuthStatus,
            crate::services::auth_service::AuthUrlResponse,
            crate::models::SessionUser,

            // Sheets
            crate::api::sheets::ValuesRequest,
            crate::api::sheets::InitResponse,
            crate::api::sheets::SuggestedIdResponse,
            crate::services::record_service::SeedResponse,
            crate::services::record_service::SeedDebug,

            // Health & Metrics
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Password login against the Users sheet, or Google OAuth. Both set an HttpOnly cookie."),
        (name = "Sheets", description = "Row-level CRUD on any sheet, plus schema bootstrap, demo seeding and ID suggestions."),
        (name = "Health", description = "Health check and system metrics endpoints for monitoring service status."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE,
                    "Set by POST /api/auth/login",
                ))),
            );
            components.add_security_scheme(
                "oauth_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    OAUTH_COOKIE,
                    "Set by GET /auth/callback",
                ))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_sheet_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| *p == "/api/sheets/data/{sheet}/{id}"));
        assert!(paths.iter().any(|p| *p == "/api/auth/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("session_cookie"));
    }
}
