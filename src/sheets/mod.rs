pub mod client;
pub mod memory;
pub mod service_account;

pub use client::*;
pub use memory::*;
pub use service_account::*;

use crate::config::{AppConfig, BackendKind};
use crate::utils::AppError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Sheet metadata as returned by `spreadsheets.get`.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeKind {
    /// Whole columns, e.g. `A:Z`.
    Columns { first: char, last: char },
    /// Top-left anchor in column A at a 1-based row, e.g. `A2`.
    Anchor { row: usize },
}

/// A1-notation range scoped to one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct A1Range {
    pub sheet: String,
    pub kind: RangeKind,
}

impl A1Range {
    pub fn columns(sheet: &str, first: char, last: char) -> Self {
        Self {
            sheet: sheet.to_string(),
            kind: RangeKind::Columns { first, last },
        }
    }

    pub fn anchor(sheet: &str, row: usize) -> Self {
        Self {
            sheet: sheet.to_string(),
            kind: RangeKind::Anchor { row },
        }
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = !self.sheet.is_empty()
            && self.sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            write!(f, "{}!", self.sheet)?;
        } else {
            write!(f, "'{}'!", self.sheet.replace('\'', "''"))?;
        }
        match self.kind {
            RangeKind::Columns { first, last } => write!(f, "{}:{}", first, last),
            RangeKind::Anchor { row } => write!(f, "A{}", row),
        }
    }
}

/// The spreadsheet primitives the row store is built on.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// `spreadsheets.get`: every sheet in the spreadsheet.
    async fn sheets(&self) -> Result<Vec<SheetInfo>, AppError>;

    /// `batchUpdate` with one `addSheet` request per title.
    async fn add_sheets(&self, titles: &[&str]) -> Result<(), AppError>;

    /// `values.get`. Trailing empty cells and rows are not returned.
    async fn get_values(&self, range: &A1Range) -> Result<Vec<Vec<String>>, AppError>;

    /// `values.update` with RAW input, starting at the range anchor.
    async fn update_values(&self, range: &A1Range, rows: Vec<Vec<String>>) -> Result<(), AppError>;

    /// `values.append` with RAW input after the last row of the table.
    async fn append_values(&self, range: &A1Range, rows: Vec<Vec<String>>) -> Result<(), AppError>;

    /// `batchUpdate` with `deleteDimension` over rows `[start, end)` (0-based grid indices).
    async fn delete_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), AppError>;
}

/// Who the outbound Sheets calls act as.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    ServiceAccount,
    UserToken(String),
}

enum ProviderKind {
    Google {
        http: reqwest::Client,
        api_base: String,
        service_account: Option<Arc<ServiceAccount>>,
    },
    Memory(Arc<MemorySheets>),
}

/// Hands out a backend bound to a credential for one request.
pub struct SheetsProvider {
    spreadsheet_id: String,
    kind: ProviderKind,
}

impl SheetsProvider {
    pub fn from_config(config: &AppConfig) -> Self {
        let kind = match config.backend {
            BackendKind::Google => {
                let http = reqwest::Client::new();
                let service_account = config
                    .service_account
                    .as_ref()
                    .map(|sa| Arc::new(ServiceAccount::new(http.clone(), sa.clone())));
                ProviderKind::Google {
                    http,
                    api_base: config.sheets_api_base.clone(),
                    service_account,
                }
            }
            BackendKind::Memory => ProviderKind::Memory(Arc::new(MemorySheets::new())),
        };

        Self {
            spreadsheet_id: config.spreadsheet_id.clone(),
            kind,
        }
    }

    pub fn memory(spreadsheet_id: &str, sheets: Arc<MemorySheets>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            kind: ProviderKind::Memory(sheets),
        }
    }

    pub fn backend(&self, credential: &Credential) -> Result<Arc<dyn SheetBackend>, AppError> {
        match &self.kind {
            ProviderKind::Memory(sheets) => {
                let backend: Arc<dyn SheetBackend> = sheets.clone();
                Ok(backend)
            }
            ProviderKind::Google {
                http,
                api_base,
                service_account,
            } => {
                let auth = match credential {
                    Credential::ServiceAccount => {
                        let account = service_account.as_ref().ok_or_else(|| {
                            AppError::ConfigurationMissing(
                                "GOOGLE_SERVICE_ACCOUNT_EMAIL or GOOGLE_PRIVATE_KEY is not set"
                                    .to_string(),
                            )
                        })?;
                        TokenSource::ServiceAccount(account.clone())
                    }
                    Credential::UserToken(token) => TokenSource::Bearer(token.clone()),
                };
                let backend: Arc<dyn SheetBackend> = Arc::new(GoogleSheets::new(
                    http.clone(),
                    api_base,
                    &self.spreadsheet_id,
                    auth,
                ));
                Ok(backend)
            }
        }
    }
}
