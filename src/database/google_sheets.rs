use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::database::service_account::{ServiceAccountKey, TokenSource};
use crate::database::a1::parse_range_start;
use crate::database::sheet_client::{CellPosition, SheetClient, SheetError};
use crate::models::sheet_api::{
    cell_to_string, AppendValuesResponse, BatchUpdateRequest, CopyPaste, GridRange, SheetRequest,
    SpreadsheetMetadata, ValueRange, ValueRangeUpdate,
};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 REST client bound to one spreadsheet.
pub struct GoogleSheetsClient {
    spreadsheet_id: String,
    base_url: String,
    http: reqwest::Client,
    tokens: TokenSource,
}

impl GoogleSheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, key: ServiceAccountKey) -> Self {
        let http = reqwest::Client::new();
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            base_url: SHEETS_API_BASE.to_string(),
            tokens: TokenSource::new(key, http.clone()),
            http,
        }
    }

    /// Points the client at a different API root, e.g. a local emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.spreadsheet_id
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    async fn auth_headers(&self) -> Result<HeaderMap, SheetError> {
        let token = self.tokens.bearer_token().await?;
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| SheetError::TokenGrant(e.to_string()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    async fn batch_update(&self, requests: Vec<SheetRequest>) -> Result<(), SheetError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let resp = self
            .http
            .post(&url)
            .headers(self.auth_headers().await?)
            .json(&BatchUpdateRequest { requests })
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SheetError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(%status, "📄 sheets api returned an error");
    Err(SheetError::Upstream { status, body })
}

async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SheetError> {
    let resp = check_status(resp).await?;
    Ok(resp.json::<T>().await?)
}

#[async_trait]
impl SheetClient for GoogleSheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let resp = self
            .http
            .get(self.values_url(range))
            .headers(self.auth_headers().await?)
            .send()
            .await?;
        let parsed: ValueRange = parse_json(resp).await?;

        Ok(parsed
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn write_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        let resp = self
            .http
            .put(self.values_url(range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .headers(self.auth_headers().await?)
            .json(&ValueRangeUpdate {
                range,
                major_dimension: "ROWS",
                values: rows,
            })
            .send()
            .await?;
        check_status(resp).await?;
        info!(range = %range, "📄 sheet range updated");
        Ok(())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<CellPosition, SheetError> {
        let url = format!("{}:append", self.values_url(range));
        let resp = self
            .http
            .post(&url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .headers(self.auth_headers().await?)
            .json(&ValueRangeUpdate {
                range,
                major_dimension: "ROWS",
                values: vec![row],
            })
            .send()
            .await?;
        let appended: AppendValuesResponse = parse_json(resp).await?;

        let (_, start) = parse_range_start(&appended.updates.updated_range)?;
        info!(range = %appended.updates.updated_range, "📄 sheet row appended");
        Ok(start)
    }

    async fn sheet_id(&self, title: &str) -> Result<i64, SheetError> {
        let resp = self
            .http
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties")])
            .headers(self.auth_headers().await?)
            .send()
            .await?;
        let meta: SpreadsheetMetadata = parse_json(resp).await?;

        meta.sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .ok_or_else(|| SheetError::SheetNotFound(title.to_string()))
    }

    async fn copy_validation(
        &self,
        sheet_id: i64,
        from: CellPosition,
        to: CellPosition,
    ) -> Result<(), SheetError> {
        let grid = |pos: CellPosition| GridRange {
            sheet_id,
            start_row_index: pos.row,
            end_row_index: pos.row + 1,
            start_column_index: pos.column,
            end_column_index: pos.column + 1,
        };
        self.batch_update(vec![SheetRequest::CopyPaste(CopyPaste {
            source: grid(from),
            destination: grid(to),
            paste_type: "PASTE_DATA_VALIDATION",
            paste_orientation: "NORMAL",
        })])
        .await
    }
}
