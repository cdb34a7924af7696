use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRangeUpdate<'a> {
    pub range: &'a str,
    pub major_dimension: &'static str,
    pub values: Vec<Vec<String>>,
}

/// Response of `values:append`; only the range that was written is used.
#[derive(Debug, Deserialize)]
pub struct AppendValuesResponse {
    pub updates: UpdatedValues,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedValues {
    pub updated_range: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetMetadata {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SheetEntry {
    pub properties: SheetEntryProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetEntryProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<SheetRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetRequest {
    CopyPaste(CopyPaste),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyPaste {
    pub source: GridRange,
    pub destination: GridRange,
    pub paste_type: &'static str,
    pub paste_orientation: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: usize,
    pub end_row_index: usize,
    pub start_column_index: usize,
    pub end_column_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Renders a cell value the way the formatted-value API would show it.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
