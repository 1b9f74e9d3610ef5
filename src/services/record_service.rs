use crate::config::AuthMode;
use crate::models::Collection;
use crate::seeds::demo_seed;
use crate::store::{Record, RowStore};
use crate::utils::AppError;
use serde::Serialize;

/// How many random suffixes to try before giving up on a collision-free ID.
const MAX_ID_ATTEMPTS: usize = 10;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedDebug {
    pub spreadsheet_id: String,
    pub sheets_updated: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SeedResponse {
    pub success: bool,
    pub message: String,
    pub debug: SeedDebug,
}

/// Per-collection CRUD plus schema bootstrap, on top of the row store.
pub struct RecordService {
    store: RowStore,
    mode: AuthMode,
}

impl RecordService {
    pub fn new(store: RowStore, mode: AuthMode) -> Self {
        Self { store, mode }
    }

    pub async fn list(&self, sheet: &str) -> Result<Vec<Record>, AppError> {
        self.store.list(sheet).await
    }

    /// Always appends; an existing row with the same ID is not detected.
    pub async fn create(&self, sheet: &str, values: Vec<String>) -> Result<(), AppError> {
        self.store.append(sheet, values).await
    }

    pub async fn update_by_id(&self, sheet: &str, id: &str, values: Vec<String>) -> Result<(), AppError> {
        ensure_addressable(sheet)?;
        let row = self.store.find_row_index(sheet, id).await?;
        log::debug!("✏️  {} id {} resolved to sheet row {}", sheet, id, row.sheet_row());
        self.store.replace(sheet, row, values).await
    }

    pub async fn delete_by_id(&self, sheet: &str, id: &str) -> Result<(), AppError> {
        ensure_addressable(sheet)?;
        let row = self.store.find_row_index(sheet, id).await?;
        log::debug!("🗑️  {} id {} resolved to sheet row {}", sheet, id, row.sheet_row());
        self.store.delete_row(sheet, row).await
    }

    /// Creates missing collection sheets with their header. Existing sheets are
    /// left alone even if their header differs. Returns the sheets created.
    pub async fn ensure_schema(&self) -> Result<Vec<Collection>, AppError> {
        let existing = self.store.sheet_titles().await?;
        let missing: Vec<Collection> = Collection::ALL
            .iter()
            .copied()
            .filter(|c| !existing.iter().any(|title| title == c.name()))
            .collect();

        if missing.is_empty() {
            log::info!("📋 Schema: all {} sheets present", Collection::ALL.len());
            return Ok(missing);
        }

        let titles: Vec<&str> = missing.iter().map(|c| c.name()).collect();
        log::info!("📋 Schema: creating sheets {:?}", titles);
        self.store.create_sheets(&titles).await?;

        for collection in &missing {
            self.store
                .write_header(collection.name(), &collection.headers(self.mode))
                .await?;
            log::info!("   ✅ Header written: {}", collection.name());
        }

        Ok(missing)
    }

    /// Ensures the schema, then overwrites the top data rows of every collection
    /// with demo records.
    pub async fn seed_demo_data(&self, masked_spreadsheet_id: String) -> Result<SeedResponse, AppError> {
        self.ensure_schema().await?;

        let mut sheets_updated = Vec::new();
        for collection in Collection::ALL {
            let rows = demo_seed::demo_rows(collection, self.mode);
            let count = rows.len();
            self.store.overwrite_from_top(collection.name(), rows).await?;
            log::info!("   🌱 Seeded {} rows into {}", count, collection.name());
            sheets_updated.push(collection.name().to_string());
        }

        Ok(SeedResponse {
            success: true,
            message: "Data sampel berhasil diisi!".to_string(),
            debug: SeedDebug {
                spreadsheet_id: masked_spreadsheet_id,
                sheets_updated,
            },
        })
    }

    /// `PREFIX-NNNN` with a random 4-digit suffix not already used in the sheet.
    pub async fn suggest_id(&self, collection: Collection) -> Result<String, AppError> {
        let prefix = collection.id_prefix().ok_or_else(|| {
            AppError::InvalidRequest(format!("{} has no generated IDs", collection.name()))
        })?;

        let existing: Vec<String> = self
            .store
            .read_rows(collection.name())
            .await?
            .into_iter()
            .skip(1)
            .filter_map(|row| row.into_iter().next())
            .collect();

        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = format!("{}-{}", prefix, random_suffix());
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
        }

        Err(AppError::UpstreamFailure(format!(
            "Could not find a free ID for {} after {} attempts",
            collection.name(),
            MAX_ID_ATTEMPTS
        )))
    }
}

/// Savings has no ID column, so rows cannot be addressed by ID.
fn ensure_addressable(sheet: &str) -> Result<(), AppError> {
    match Collection::from_name(sheet) {
        Some(collection) if collection.id_field().is_none() => Err(AppError::InvalidRequest(format!(
            "{} is append-only",
            collection.name()
        ))),
        _ => Ok(()),
    }
}

/// 1000..=9999
fn random_suffix() -> u32 {
    (uuid::Uuid::new_v4().as_u128() % 9000) as u32 + 1000
}
