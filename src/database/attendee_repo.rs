use tracing::info;

use crate::database::a1::{cell_range, quote_sheet_name, row_range};
use crate::database::sheet_client::{CellPosition, SheetClient, SheetError};
use crate::models::SheetSnapshot;

/// Reads the whole attendee tab. Every request starts from a fresh read.
pub async fn load_snapshot(
    client: &dyn SheetClient,
    sheet: &str,
) -> Result<SheetSnapshot, SheetError> {
    let values = client.read_range(&quote_sheet_name(sheet)).await?;
    Ok(SheetSnapshot::from_values(values))
}

pub async fn update_cell(
    client: &dyn SheetClient,
    sheet: &str,
    pos: CellPosition,
    value: &str,
) -> Result<(), SheetError> {
    let range = cell_range(sheet, pos);
    client
        .write_range(&range, vec![vec![value.to_string()]])
        .await?;
    info!(range = %range, value = %value, "📝 status cell written");
    Ok(())
}

/// Appends an attendee row below the existing data and returns the zero-based
/// grid row it was written to.
pub async fn append_row(
    client: &dyn SheetClient,
    sheet: &str,
    cells: Vec<String>,
) -> Result<usize, SheetError> {
    let range = row_range(sheet, 0, cells.len());
    let start = client.append_row(&range, cells).await?;
    info!(sheet = %sheet, row = start.row + 1, "📝 attendee row appended");
    Ok(start.row)
}

pub async fn sheet_id(client: &dyn SheetClient, sheet: &str) -> Result<i64, SheetError> {
    client.sheet_id(sheet).await
}

pub async fn copy_validation(
    client: &dyn SheetClient,
    sheet_id: i64,
    from: CellPosition,
    to: CellPosition,
) -> Result<(), SheetError> {
    client.copy_validation(sheet_id, from, to).await
}
