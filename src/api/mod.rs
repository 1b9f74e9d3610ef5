pub mod auth;
pub mod health;
pub mod metrics;
pub mod sheets;
pub mod swagger;

#[cfg(test)]
pub mod test_support;

use actix_web::web;

use crate::middleware::SessionGuard;

/// The route table shared by both auth modes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth endpoints
        .service(
            web::scope("/api/auth")
                .route("/login", web::post().to(auth::login))
                .route("/status", web::get().to(auth::status))
                .route("/logout", web::post().to(auth::logout))
                .route("/url", web::get().to(auth::auth_url)),
        )
        // Google redirects here, outside the /api prefix
        .route("/auth/callback", web::get().to(auth::callback))
        // ==================== SHEETS ====================
        .service(
            web::scope("/api/sheets")
                .service(
                    web::scope("/data")
                        .wrap(SessionGuard::required())
                        .route("/{sheet}", web::get().to(sheets::list_records))
                        .route("/{sheet}", web::post().to(sheets::create_record))
                        .route("/{sheet}/{id}", web::put().to(sheets::update_record))
                        .route("/{sheet}/{id}", web::delete().to(sheets::delete_record)),
                )
                .service(
                    web::resource("/id/{sheet}")
                        .wrap(SessionGuard::required())
                        .route(web::get().to(sheets::suggest_id)),
                )
                // Schema and seed must work before any user exists
                .service(
                    web::resource("/init")
                        .wrap(SessionGuard::bootstrap())
                        .route(web::get().to(sheets::init_sheets)),
                )
                .service(
                    web::resource("/seed")
                        .wrap(SessionGuard::bootstrap())
                        .route(web::post().to(sheets::seed_sheets)),
                ),
        );
}
