use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheets request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sheets api returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("token grant failed: {0}")]
    TokenGrant(String),

    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),
}

/// Zero-based cell coordinates; row 0 is the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPosition {
    pub row: usize,
    pub column: usize,
}

/// Remote spreadsheet operations the attendee workflow needs.
///
/// Ranges are A1 strings including the sheet title. Every call is a remote
/// round-trip in the Google implementation and nothing is retried.
#[async_trait]
pub trait SheetClient: Send + Sync {
    /// Reads formatted values as rows of strings. Trailing empty cells and rows are omitted.
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError>;

    /// Writes values starting at the range's top-left cell, parsed as if typed by a user.
    async fn write_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError>;

    /// Appends one row after the last row of the table found in `range`, inserting
    /// grid rows as needed. Returns the top-left cell the row landed on.
    ///
    /// The position is chosen by the sheet, so concurrent appends never share a row.
    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<CellPosition, SheetError>;

    /// Numeric id of the tab titled `title`, used by grid-level requests.
    async fn sheet_id(&self, title: &str) -> Result<i64, SheetError>;

    /// Copies only the data validation rule of `from` onto `to`.
    async fn copy_validation(
        &self,
        sheet_id: i64,
        from: CellPosition,
        to: CellPosition,
    ) -> Result<(), SheetError>;
}
