use super::{A1Range, SheetBackend, SheetInfo, ServiceAccount};
use crate::utils::AppError;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub enum TokenSource {
    ServiceAccount(Arc<ServiceAccount>),
    /// Token from the user's OAuth cookie, used verbatim.
    Bearer(String),
}

impl TokenSource {
    async fn token(&self) -> Result<String, AppError> {
        match self {
            TokenSource::ServiceAccount(account) => account.access_token().await,
            TokenSource::Bearer(token) => Ok(token.clone()),
        }
    }
}

// ==================== Wire types ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct ValueRangeBody {
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

// ==================== Client ====================

/// Google Sheets v4 REST client bound to one spreadsheet and one credential.
pub struct GoogleSheets {
    http: reqwest::Client,
    spreadsheet_url: String,
    auth: TokenSource,
}

impl GoogleSheets {
    pub fn new(http: reqwest::Client, api_base: &str, spreadsheet_id: &str, auth: TokenSource) -> Self {
        Self {
            http,
            spreadsheet_url: format!(
                "{}/spreadsheets/{}",
                api_base.trim_end_matches('/'),
                urlencoding::encode(spreadsheet_id)
            ),
            auth,
        }
    }

    fn values_url(&self, range: &A1Range, suffix: &str) -> String {
        format!(
            "{}/values/{}{}",
            self.spreadsheet_url,
            urlencoding::encode(&range.to_string()),
            suffix
        )
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, AppError> {
        let token = self.auth.token().await?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header("Accept", "application/json"))
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Response, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("{} failed: {}", operation, e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        log::warn!("⚠️  Sheets {} returned {}: {}", operation, status, body);
        Err(map_api_error(status, &body))
    }

    async fn batch_update(&self, requests: Vec<serde_json::Value>, operation: &str) -> Result<(), AppError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url);
        let builder = self
            .request(Method::POST, &url)
            .await?
            .json(&serde_json::json!({ "requests": requests }));
        self.send(builder, operation).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn sheets(&self) -> Result<Vec<SheetInfo>, AppError> {
        let url = format!("{}?fields=sheets.properties(sheetId,title)", self.spreadsheet_url);
        let response = self
            .send(self.request(Method::GET, &url).await?, "spreadsheets.get")
            .await?;

        let spreadsheet: SpreadsheetResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to parse spreadsheet: {}", e)))?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| SheetInfo {
                sheet_id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .collect())
    }

    async fn add_sheets(&self, titles: &[&str]) -> Result<(), AppError> {
        let requests = titles
            .iter()
            .map(|title| serde_json::json!({ "addSheet": { "properties": { "title": title } } }))
            .collect();
        self.batch_update(requests, "batchUpdate(addSheet)").await
    }

    async fn get_values(&self, range: &A1Range) -> Result<Vec<Vec<String>>, AppError> {
        let url = self.values_url(range, "");
        let response = self
            .send(self.request(Method::GET, &url).await?, "values.get")
            .await?;

        let body: ValueRangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to parse values: {}", e)))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_values(&self, range: &A1Range, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        let url = self.values_url(range, "?valueInputOption=RAW");
        let builder = self
            .request(Method::PUT, &url)
            .await?
            .json(&ValueRangeBody { values: rows });
        self.send(builder, "values.update").await?;
        Ok(())
    }

    async fn append_values(&self, range: &A1Range, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        let url = self.values_url(range, ":append?valueInputOption=RAW");
        let builder = self
            .request(Method::POST, &url)
            .await?
            .json(&ValueRangeBody { values: rows });
        self.send(builder, "values.append").await?;
        Ok(())
    }

    async fn delete_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), AppError> {
        let request = serde_json::json!({
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": start,
                    "endIndex": end,
                }
            }
        });
        self.batch_update(vec![request], "batchUpdate(deleteDimension)").await
    }
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A missing sheet surfaces upstream as a 400 "Unable to parse range".
/// Everything else, including a rejected token, is an upstream failure.
fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Spreadsheet API returned {}", status));

    if status == StatusCode::NOT_FOUND || message.contains("Unable to parse range") {
        AppError::NotFound(message)
    } else {
        AppError::UpstreamFailure(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_url_encodes_range() {
        let client = GoogleSheets::new(
            reqwest::Client::new(),
            "https://sheets.googleapis.com/v4/",
            "abc123",
            TokenSource::Bearer("t".into()),
        );
        assert_eq!(
            client.values_url(&A1Range::columns("Members", 'A', 'Z'), ":append?valueInputOption=RAW"),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Members%21A%3AZ:append?valueInputOption=RAW"
        );
    }

    #[test]
    fn test_unknown_sheet_maps_to_not_found() {
        let body = r#"{"error":{"code":400,"message":"Unable to parse range: Loans!A:Z","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            map_api_error(StatusCode::BAD_REQUEST, body),
            AppError::NotFound("Unable to parse range: Loans!A:Z".to_string())
        );
    }

    #[test]
    fn test_other_errors_are_upstream_failures() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission"}}"#;
        assert_eq!(
            map_api_error(StatusCode::FORBIDDEN, body),
            AppError::UpstreamFailure("The caller does not have permission".to_string())
        );
        assert_eq!(
            map_api_error(StatusCode::BAD_GATEWAY, "<html>"),
            AppError::UpstreamFailure("Spreadsheet API returned 502 Bad Gateway".to_string())
        );
    }

    #[test]
    fn test_upstream_401_is_upstream_failure() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;
        let err = map_api_error(StatusCode::UNAUTHORIZED, body);
        assert_eq!(
            err,
            AppError::UpstreamFailure("Request had invalid authentication credentials.".to_string())
        );
        assert_eq!(
            actix_web::ResponseError::status_code(&err),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cells_are_stringified() {
        assert_eq!(cell_to_string(serde_json::json!("Budi")), "Budi");
        assert_eq!(cell_to_string(serde_json::json!(500000)), "500000");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }
}
