use super::{A1Range, RangeKind, SheetBackend, SheetInfo};
use crate::utils::AppError;
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct MemorySheet {
    sheet_id: i64,
    title: String,
    rows: Vec<Vec<String>>,
}

impl MemorySheet {
    /// Rows up to the last one holding a non-empty cell.
    fn used_rows(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

/// Process-local spreadsheet mirroring the Sheets API value semantics.
/// Backs `SHEETS_BACKEND=memory` and the test suites.
#[derive(Debug, Default)]
pub struct MemorySheets {
    sheets: RwLock<Vec<MemorySheet>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a spreadsheet from `(title, rows)` pairs; sheet ids follow insertion order.
    pub fn with_sheets(sheets: Vec<(&str, Vec<Vec<&str>>)>) -> Self {
        let sheets = sheets
            .into_iter()
            .enumerate()
            .map(|(i, (title, rows))| MemorySheet {
                sheet_id: i as i64,
                title: title.to_string(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(String::from).collect())
                    .collect(),
            })
            .collect();
        Self {
            sheets: RwLock::new(sheets),
        }
    }

    /// Raw rows of a sheet, for assertions.
    pub fn snapshot(&self, title: &str) -> Option<Vec<Vec<String>>> {
        let sheets = self.sheets.read().ok()?;
        sheets.iter().find(|s| s.title == title).map(|s| s.rows.clone())
    }

    fn poisoned() -> AppError {
        AppError::UpstreamFailure("In-memory spreadsheet lock poisoned".to_string())
    }

    fn missing(range: &A1Range) -> AppError {
        AppError::NotFound(format!("Unable to parse range: {}", range))
    }
}

fn column_index(column: char) -> usize {
    (column.to_ascii_uppercase() as u8).saturating_sub(b'A') as usize
}

fn trim_trailing_empty(mut row: Vec<String>) -> Vec<String> {
    while row.last().map(|c| c.is_empty()).unwrap_or(false) {
        row.pop();
    }
    row
}

#[async_trait]
impl SheetBackend for MemorySheets {
    async fn sheets(&self) -> Result<Vec<SheetInfo>, AppError> {
        let sheets = self.sheets.read().map_err(|_| Self::poisoned())?;
        Ok(sheets
            .iter()
            .map(|s| SheetInfo {
                sheet_id: s.sheet_id,
                title: s.title.clone(),
            })
            .collect())
    }

    async fn add_sheets(&self, titles: &[&str]) -> Result<(), AppError> {
        let mut sheets = self.sheets.write().map_err(|_| Self::poisoned())?;

        // batchUpdate is atomic: validate everything before adding anything
        for title in titles {
            if sheets.iter().any(|s| s.title == *title) {
                return Err(AppError::UpstreamFailure(format!(
                    "A sheet with the name \"{}\" already exists",
                    title
                )));
            }
        }

        for title in titles {
            let sheet_id = sheets.iter().map(|s| s.sheet_id).max().map(|id| id + 1).unwrap_or(0);
            sheets.push(MemorySheet {
                sheet_id,
                title: title.to_string(),
                rows: Vec::new(),
            });
        }
        Ok(())
    }

    async fn get_values(&self, range: &A1Range) -> Result<Vec<Vec<String>>, AppError> {
        let sheets = self.sheets.read().map_err(|_| Self::poisoned())?;
        let sheet = sheets
            .iter()
            .find(|s| s.title == range.sheet)
            .ok_or_else(|| Self::missing(range))?;

        let (first, last, skip) = match range.kind {
            RangeKind::Columns { first, last } => (column_index(first), column_index(last), 0),
            RangeKind::Anchor { row } => (0, usize::MAX - 1, row.saturating_sub(1)),
        };

        let mut values: Vec<Vec<String>> = sheet
            .rows
            .iter()
            .skip(skip)
            .map(|row| {
                let end = row.len().min(last + 1);
                let cells = if first < end { row[first..end].to_vec() } else { Vec::new() };
                trim_trailing_empty(cells)
            })
            .collect();

        while values.last().map(|r| r.is_empty()).unwrap_or(false) {
            values.pop();
        }
        Ok(values)
    }

    async fn update_values(&self, range: &A1Range, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        let start = match range.kind {
            RangeKind::Anchor { row } => row.saturating_sub(1),
            RangeKind::Columns { .. } => 0,
        };

        let mut sheets = self.sheets.write().map_err(|_| Self::poisoned())?;
        let sheet = sheets
            .iter_mut()
            .find(|s| s.title == range.sheet)
            .ok_or_else(|| Self::missing(range))?;

        for (offset, values) in rows.into_iter().enumerate() {
            let index = start + offset;
            if sheet.rows.len() <= index {
                sheet.rows.resize(index + 1, Vec::new());
            }
            let target = &mut sheet.rows[index];
            if target.len() < values.len() {
                target.resize(values.len(), String::new());
            }
            // Cells past the written values are left untouched
            for (col, value) in values.into_iter().enumerate() {
                target[col] = value;
            }
        }
        Ok(())
    }

    async fn append_values(&self, range: &A1Range, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        let mut sheets = self.sheets.write().map_err(|_| Self::poisoned())?;
        let sheet = sheets
            .iter_mut()
            .find(|s| s.title == range.sheet)
            .ok_or_else(|| Self::missing(range))?;

        let used = sheet.used_rows();
        sheet.rows.truncate(used);
        sheet.rows.extend(rows);
        Ok(())
    }

    async fn delete_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), AppError> {
        let mut sheets = self.sheets.write().map_err(|_| Self::poisoned())?;
        let sheet = sheets
            .iter_mut()
            .find(|s| s.sheet_id == sheet_id)
            .ok_or_else(|| AppError::NotFound(format!("No sheet with id: {}", sheet_id)))?;

        if start >= end || start >= sheet.rows.len() {
            return Ok(());
        }
        let end = end.min(sheet.rows.len());
        sheet.rows.drain(start..end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> MemorySheets {
        MemorySheets::with_sheets(vec![(
            "Members",
            vec![
                vec!["ID", "Name", "Email"],
                vec!["MBR-1001", "Budi", "budi@email.com"],
                vec!["MBR-1002", "Siti", ""],
            ],
        )])
    }

    #[tokio::test]
    async fn test_get_values_trims_trailing_cells_and_limits_columns() {
        let sheets = members();
        let all = sheets.get_values(&A1Range::columns("Members", 'A', 'Z')).await.unwrap();
        assert_eq!(all[2], vec!["MBR-1002", "Siti"]);

        let ids = sheets.get_values(&A1Range::columns("Members", 'A', 'A')).await.unwrap();
        assert_eq!(ids, vec![vec!["ID"], vec!["MBR-1001"], vec!["MBR-1002"]]);
    }

    #[tokio::test]
    async fn test_missing_sheet_is_not_found() {
        let sheets = members();
        let err = sheets
            .get_values(&A1Range::columns("Loans", 'A', 'Z'))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_overwrites_positionally_and_extends() {
        let sheets = members();
        sheets
            .update_values(
                &A1Range::anchor("Members", 3),
                vec![
                    vec!["MBR-2002".to_string()],
                    vec!["MBR-2003".to_string(), "Agus".to_string()],
                ],
            )
            .await
            .unwrap();

        let rows = sheets.snapshot("Members").unwrap();
        assert_eq!(rows[2], vec!["MBR-2002", "Siti", ""]);
        assert_eq!(rows[3], vec!["MBR-2003", "Agus"]);
    }

    #[tokio::test]
    async fn test_append_goes_after_last_used_row() {
        let sheets = members();
        sheets
            .update_values(&A1Range::anchor("Members", 6), vec![vec![String::new()]])
            .await
            .unwrap();
        sheets
            .append_values(
                &A1Range::columns("Members", 'A', 'A'),
                vec![vec!["MBR-1003".to_string()]],
            )
            .await
            .unwrap();

        let rows = sheets.snapshot("Members").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec!["MBR-1003"]);
    }

    #[tokio::test]
    async fn test_add_sheets_rejects_duplicates_atomically() {
        let sheets = members();
        let err = sheets.add_sheets(&["Products", "Members"]).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailure(_)));
        assert!(sheets.snapshot("Products").is_none());

        sheets.add_sheets(&["Products"]).await.unwrap();
        let all = sheets.sheets().await.unwrap();
        assert_eq!(all[1], SheetInfo { sheet_id: 1, title: "Products".to_string() });
    }

    #[tokio::test]
    async fn test_delete_rows_shifts_up() {
        let sheets = members();
        sheets.delete_rows(0, 1, 2).await.unwrap();
        let rows = sheets.snapshot("Members").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "MBR-1002");
    }
}
