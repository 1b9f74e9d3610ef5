//! In-memory application wiring for handler tests.

use actix_web::web;
use std::sync::Arc;

use crate::config::{AppConfig, AuthMode, BackendKind};
use crate::services::auth_service::build_gate;
use crate::services::record_service::RecordService;
use crate::sheets::{MemorySheets, SheetsProvider};
use crate::store::RowStore;

pub const TEST_SPREADSHEET_ID: &str = "memory-test-sheet";

pub fn memory_config(mode: AuthMode, enforce_roles: bool) -> AppConfig {
    let mut config = AppConfig::from_lookup(|_| None).expect("default config");
    config.spreadsheet_id = TEST_SPREADSHEET_ID.to_string();
    config.auth_mode = mode;
    config.backend = BackendKind::Memory;
    config.enforce_roles = enforce_roles;
    config.session_secret = "test-secret".to_string();
    config.oauth.client_id = Some("test-client".to_string());
    config
}

/// Registers app data the way `main` does, over the given sheets.
pub fn app_with(config: AppConfig, memory: Arc<MemorySheets>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let provider = Arc::new(SheetsProvider::memory(&config.spreadsheet_id, memory));
        let gate = build_gate(&config, provider.clone());
        cfg.app_data(web::Data::new(config))
            .app_data(web::Data::from(provider))
            .app_data(web::Data::from(gate));
        super::configure(cfg);
    }
}

/// Empty spreadsheet.
pub fn memory_app(mode: AuthMode, enforce_roles: bool) -> impl FnOnce(&mut web::ServiceConfig) {
    app_with(memory_config(mode, enforce_roles), Arc::new(MemorySheets::new()))
}

/// Spreadsheet with every collection created and demo rows written.
pub async fn seeded_app(mode: AuthMode, enforce_roles: bool) -> impl FnOnce(&mut web::ServiceConfig) {
    let memory = Arc::new(MemorySheets::new());
    RecordService::new(RowStore::new(memory.clone()), mode)
        .seed_demo_data("masked".to_string())
        .await
        .expect("seed demo data");
    app_with(memory_config(mode, enforce_roles), memory)
}

/// Logs in through the HTTP route and returns the session cookie.
macro_rules! login {
    ($app:expr, $email:expr, $password:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "email": $email, "password": $password }))
            .to_request();
        let resp = actix_web::test::call_service($app, req).await;
        assert_eq!(resp.status(), 200, "login as {}", $email);
        resp.response()
            .cookies()
            .find(|c| c.name() == $crate::services::auth_service::SESSION_COOKIE)
            .map(|c| c.into_owned())
            .expect("session cookie")
    }};
}

pub(crate) use login;
