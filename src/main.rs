mod api;
mod config;
mod middleware;
mod models;
mod seeds;
mod services;
mod sheets;
mod store;
mod utils;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, AuthMode, BackendKind};
use crate::services::auth_service::build_gate;
use crate::sheets::SheetsProvider;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    log::info!("🚀 Starting Koperasi Service...");
    log::info!("📊 Spreadsheet: {}", config.masked_spreadsheet_id());
    log::info!("🔐 Auth mode: {}", config.auth_mode.as_str());

    match config.backend {
        BackendKind::Google => log::info!("☁️  Sheets backend: Google ({})", config.sheets_api_base),
        BackendKind::Memory => log::warn!("⚠️  Sheets backend: in-memory, data is lost on restart"),
    }

    if config.auth_mode == AuthMode::Session && config.service_account.is_none() {
        log::warn!("⚠️  GOOGLE_SERVICE_ACCOUNT_EMAIL / GOOGLE_PRIVATE_KEY not set, login will fail");
    }
    if config.auth_mode == AuthMode::OAuth && config.oauth.client_id.is_none() {
        log::warn!("⚠️  GOOGLE_CLIENT_ID not set, OAuth login will fail");
    }
    if config.enforce_roles {
        log::info!("🛡️  Role checks enforced on writes");
    }

    let provider = Arc::new(SheetsProvider::from_config(&config));
    let gate = build_gate(&config, provider.clone());

    let provider_data = web::Data::from(provider);
    let gate_data = web::Data::from(gate);
    let config_data = web::Data::new(config.clone());

    let serve_static = Path::new(&config.static_dir).is_dir();
    if serve_static {
        log::info!("📦 Serving dashboard from {}", config.static_dir);
    } else {
        log::info!("📦 {} not found, API only", config.static_dir);
    }

    let host = config.host.clone();
    let port = config.port;

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_url)
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
                actix_web::http::header::PRAGMA,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        let mut app = App::new()
            .app_data(config_data.clone())
            .app_data(provider_data.clone())
            .app_data(gate_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .configure(api::configure);

        // SPA bundle last so it never shadows an API route
        if serve_static {
            let static_dir = config.static_dir.clone();
            let index = Path::new(&static_dir).join("index.html");
            app = app.service(
                Files::new("/", &static_dir)
                    .index_file("index.html")
                    .default_handler(fn_service(move |req: ServiceRequest| {
                        let index = index.clone();
                        async move {
                            let (req, _) = req.into_parts();
                            let file = NamedFile::open_async(index).await?;
                            let res = file.into_response(&req);
                            Ok(ServiceResponse::new(req, res))
                        }
                    })),
            );
        }

        app
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
