use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppConfig;
use crate::models::Collection;
use crate::services::auth_service::{AuthGate, Principal};
use crate::services::record_service::{RecordService, SeedResponse};
use crate::sheets::SheetsProvider;
use crate::store::RowStore;
use crate::utils::AppError;

/// Row values in header order. Numbers and booleans are written as text.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ValuesRequest {
    #[schema(value_type = Vec<Object>)]
    pub values: Vec<Value>,
}

impl ValuesRequest {
    fn into_cells(self) -> Vec<String> {
        self.values
            .into_iter()
            .map(|value| match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InitResponse {
    pub success: bool,
    pub message: String,
    /// Sheets created by this call; empty when the schema was already complete.
    pub created: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SuggestedIdResponse {
    pub id: String,
}

fn record_service(
    principal: &Principal,
    provider: &SheetsProvider,
    gate: &dyn AuthGate,
) -> Result<RecordService, AppError> {
    let backend = provider.backend(&principal.credential)?;
    Ok(RecordService::new(RowStore::new(backend), gate.mode()))
}

fn success() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

#[utoipa::path(
    get,
    path = "/api/sheets/data/{sheet}",
    tag = "Sheets",
    params(("sheet" = String, Path, description = "Sheet name, e.g. Members")),
    responses(
        (status = 200, description = "Every data row keyed by header field"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Sheet not found")
    )
)]
pub async fn list_records(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
    sheet: web::Path<String>,
) -> HttpResponse {
    log::info!("📋 GET /sheets/data/{}", sheet);

    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.list(&sheet).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(records) => {
            log::info!("✅ {} records from {}", records.len(), sheet);
            HttpResponse::Ok().json(records)
        }
        Err(e) => {
            log::error!("❌ Error listing {}: {}", sheet, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sheets/data/{sheet}",
    tag = "Sheets",
    params(("sheet" = String, Path, description = "Sheet name")),
    request_body = ValuesRequest,
    responses(
        (status = 200, description = "Row appended"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Role may not write this sheet")
    )
)]
pub async fn create_record(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
    config: web::Data<AppConfig>,
    sheet: web::Path<String>,
    request: web::Json<ValuesRequest>,
) -> HttpResponse {
    log::info!("➕ POST /sheets/data/{}", sheet);

    if let Err(e) = principal.ensure_can_write(&sheet, config.enforce_roles) {
        log::warn!("🚫 {}", e);
        return e.error_response();
    }

    let cells = request.into_inner().into_cells();
    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.create(&sheet, cells).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            log::info!("✅ Row appended to {}", sheet);
            success()
        }
        Err(e) => {
            log::error!("❌ Error appending to {}: {}", sheet, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/sheets/data/{sheet}/{id}",
    tag = "Sheets",
    params(
        ("sheet" = String, Path, description = "Sheet name"),
        ("id" = String, Path, description = "Value of the first column")
    ),
    request_body = ValuesRequest,
    responses(
        (status = 200, description = "Row replaced"),
        (status = 400, description = "Sheet is append-only"),
        (status = 404, description = "No row with this id")
    )
)]
pub async fn update_record(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
    config: web::Data<AppConfig>,
    path: web::Path<(String, String)>,
    request: web::Json<ValuesRequest>,
) -> HttpResponse {
    let (sheet, id) = path.into_inner();
    log::info!("✏️  PUT /sheets/data/{}/{}", sheet, id);

    if let Err(e) = principal.ensure_can_write(&sheet, config.enforce_roles) {
        log::warn!("🚫 {}", e);
        return e.error_response();
    }

    let cells = request.into_inner().into_cells();
    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.update_by_id(&sheet, &id, cells).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            log::info!("✅ {} {} updated", sheet, id);
            success()
        }
        Err(e @ AppError::NotFound(_)) => {
            log::warn!("⚠️  {} {} not found", sheet, id);
            e.error_response()
        }
        Err(e) => {
            log::error!("❌ Error updating {} {}: {}", sheet, id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/sheets/data/{sheet}/{id}",
    tag = "Sheets",
    params(
        ("sheet" = String, Path, description = "Sheet name"),
        ("id" = String, Path, description = "Value of the first column")
    ),
    responses(
        (status = 200, description = "Row removed, later rows shift up"),
        (status = 400, description = "Sheet is append-only"),
        (status = 404, description = "No row with this id")
    )
)]
pub async fn delete_record(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
    config: web::Data<AppConfig>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (sheet, id) = path.into_inner();
    log::info!("🗑️  DELETE /sheets/data/{}/{}", sheet, id);

    if let Err(e) = principal.ensure_can_write(&sheet, config.enforce_roles) {
        log::warn!("🚫 {}", e);
        return e.error_response();
    }

    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.delete_by_id(&sheet, &id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            log::info!("✅ {} {} deleted", sheet, id);
            success()
        }
        Err(e @ AppError::NotFound(_)) => {
            log::warn!("⚠️  {} {} not found", sheet, id);
            e.error_response()
        }
        Err(e) => {
            log::error!("❌ Error deleting {} {}: {}", sheet, id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/sheets/init",
    tag = "Sheets",
    responses(
        (status = 200, description = "Every collection sheet exists with its header", body = InitResponse),
        (status = 500, description = "Credentials missing or spreadsheet unreachable")
    )
)]
pub async fn init_sheets(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
) -> HttpResponse {
    log::info!("📋 GET /sheets/init - Ensuring schema");

    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.ensure_schema().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(created) => {
            log::info!("✅ Schema ready ({} sheets created)", created.len());
            HttpResponse::Ok().json(InitResponse {
                success: true,
                message: "Sheets initialized".to_string(),
                created: created.iter().map(|c| c.name().to_string()).collect(),
            })
        }
        Err(e) => {
            log::error!("❌ Error initializing sheets: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sheets/seed",
    tag = "Sheets",
    responses(
        (status = 200, description = "Demo rows written to every collection", body = SeedResponse),
        (status = 500, description = "Credentials missing or spreadsheet unreachable")
    )
)]
pub async fn seed_sheets(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    log::info!("🌱 POST /sheets/seed - Writing demo data to {}", config.masked_spreadsheet_id());

    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.seed_demo_data(config.masked_spreadsheet_id()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => {
            log::info!("✅ Seeded {} sheets", response.debug.sheets_updated.len());
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::error!("❌ Error seeding sheets: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/sheets/id/{sheet}",
    tag = "Sheets",
    params(("sheet" = String, Path, description = "Members, Products or Transactions")),
    responses(
        (status = 200, description = "Unused ID for a new record", body = SuggestedIdResponse),
        (status = 400, description = "Sheet has no generated IDs"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn suggest_id(
    principal: web::ReqData<Principal>,
    provider: web::Data<SheetsProvider>,
    gate: web::Data<dyn AuthGate>,
    sheet: web::Path<String>,
) -> HttpResponse {
    log::debug!("🔢 GET /sheets/id/{}", sheet);

    let collection = match Collection::from_name(&sheet) {
        Some(c) => c,
        None => {
            return AppError::NotFound(format!("Unknown collection: {}", sheet)).error_response();
        }
    };

    let result = match record_service(&principal, &provider, gate.get_ref()) {
        Ok(service) => service.suggest_id(collection).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(id) => HttpResponse::Ok().json(SuggestedIdResponse { id }),
        Err(e) => {
            log::error!("❌ Error suggesting id for {}: {}", sheet, e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod cell_tests {
    use super::*;

    #[test]
    fn test_values_are_stringified() {
        let request: ValuesRequest = serde_json::from_value(serde_json::json!({
            "values": ["PRD-2005", "Teh", 4500, true, null]
        }))
        .unwrap();
        assert_eq!(request.into_cells(), vec!["PRD-2005", "Teh", "4500", "true", ""]);
    }
}
