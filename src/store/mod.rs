use crate::sheets::{A1Range, SheetBackend, SheetInfo};
use crate::utils::AppError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One decoded row: header field -> cell. Fields missing from the row are absent.
pub type Record = Map<String, Value>;

/// Last column read when listing a sheet.
const LAST_COLUMN: char = 'Z';

/// Position of a data row, counted from the first row after the header.
///
/// Only valid until the next delete on the same sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRow(pub usize);

impl DataRow {
    /// 1-based sheet row number (A1 notation).
    pub fn sheet_row(&self) -> usize {
        self.0 + 2
    }

    /// 0-based grid index (deleteDimension).
    pub fn grid_index(&self) -> usize {
        self.0 + 1
    }
}

/// Header-addressed view over a spreadsheet's sheets.
#[derive(Clone)]
pub struct RowStore {
    backend: Arc<dyn SheetBackend>,
}

impl RowStore {
    pub fn new(backend: Arc<dyn SheetBackend>) -> Self {
        Self { backend }
    }

    /// Every data row zipped against the header row.
    pub async fn list(&self, sheet: &str) -> Result<Vec<Record>, AppError> {
        let rows = self.read_rows(sheet).await?;
        Ok(decode_rows(&rows))
    }

    /// Raw rows including the header.
    pub async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, AppError> {
        self.backend
            .get_values(&A1Range::columns(sheet, 'A', LAST_COLUMN))
            .await
    }

    /// First data row whose first cell equals `id`.
    pub async fn find_row_index(&self, sheet: &str, id: &str) -> Result<DataRow, AppError> {
        let column = self.backend.get_values(&A1Range::columns(sheet, 'A', 'A')).await?;

        column
            .iter()
            .skip(1)
            .position(|row| row.first().map(String::as_str) == Some(id))
            .map(DataRow)
            .ok_or_else(|| AppError::NotFound("Data not found".to_string()))
    }

    pub async fn append(&self, sheet: &str, values: Vec<String>) -> Result<(), AppError> {
        self.backend
            .append_values(&A1Range::columns(sheet, 'A', 'A'), vec![values])
            .await
    }

    /// Overwrites the row starting at column A. Callers submit the full row.
    pub async fn replace(&self, sheet: &str, row: DataRow, values: Vec<String>) -> Result<(), AppError> {
        self.backend
            .update_values(&A1Range::anchor(sheet, row.sheet_row()), vec![values])
            .await
    }

    /// Removes the row; later rows shift up by one.
    pub async fn delete_row(&self, sheet: &str, row: DataRow) -> Result<(), AppError> {
        let info = self
            .sheet_info(sheet)
            .await?
            .ok_or_else(|| AppError::NotFound("Sheet not found".to_string()))?;

        self.backend
            .delete_rows(info.sheet_id, row.grid_index(), row.grid_index() + 1)
            .await
    }

    // ==================== Provisioning ====================

    pub async fn sheet_titles(&self) -> Result<Vec<String>, AppError> {
        Ok(self.backend.sheets().await?.into_iter().map(|s| s.title).collect())
    }

    pub async fn sheet_info(&self, sheet: &str) -> Result<Option<SheetInfo>, AppError> {
        Ok(self
            .backend
            .sheets()
            .await?
            .into_iter()
            .find(|s| s.title == sheet))
    }

    pub async fn create_sheets(&self, titles: &[&str]) -> Result<(), AppError> {
        if titles.is_empty() {
            return Ok(());
        }
        self.backend.add_sheets(titles).await
    }

    pub async fn write_header(&self, sheet: &str, header: &[&str]) -> Result<(), AppError> {
        let header = header.iter().map(|h| h.to_string()).collect();
        self.backend
            .update_values(&A1Range::anchor(sheet, 1), vec![header])
            .await
    }

    /// Writes `rows` starting at the first data row, overwriting what is there.
    pub async fn overwrite_from_top(&self, sheet: &str, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        self.backend
            .update_values(&A1Range::anchor(sheet, DataRow(0).sheet_row()), rows)
            .await
    }
}

fn decode_rows(rows: &[Vec<String>]) -> Vec<Record> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };

    data.iter()
        .map(|row| {
            header
                .iter()
                .zip(row.iter())
                .map(|(field, cell)| (field.clone(), Value::String(cell.clone())))
                .collect()
        })
        .collect()
}
