use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub auth_mode: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(config: web::Data<AppConfig>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "koperasi-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_mode: config.auth_mode.as_str().to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
