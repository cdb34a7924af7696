use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::database::a1::{parse_cell, split_range};
use crate::database::sheet_client::{CellPosition, SheetClient, SheetError};

const DEFAULT_GRID_ROWS: usize = 1000;

#[derive(Debug, Default)]
struct Grid {
    sheet_id: i64,
    row_count: usize,
    cells: Vec<Vec<String>>,
    validations: HashMap<CellPosition, String>,
    formulas: HashSet<CellPosition>,
}

impl Grid {
    /// Stores a value the way `USER_ENTERED` input is parsed: a leading `'` forces
    /// text and is dropped, a leading `=` makes a formula.
    fn enter(&mut self, pos: CellPosition, value: String) {
        let value = match value.strip_prefix('\'') {
            Some(text) => {
                self.formulas.remove(&pos);
                text.to_string()
            }
            None => {
                if value.starts_with('=') {
                    self.formulas.insert(pos);
                } else {
                    self.formulas.remove(&pos);
                }
                value
            }
        };
        self.set(pos, value);
    }

    fn set(&mut self, pos: CellPosition, value: String) {
        if self.cells.len() <= pos.row {
            self.cells.resize_with(pos.row + 1, Vec::new);
        }
        let row = &mut self.cells[pos.row];
        if row.len() <= pos.column {
            row.resize(pos.column + 1, String::new());
        }
        row[pos.column] = value;
    }

    /// Values as the API reports them: no trailing empty cells or rows.
    fn trimmed(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .cells
            .iter()
            .map(|row| {
                let keep = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..keep].to_vec()
            })
            .collect();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

/// In-process spreadsheet with the same observable behavior as the remote one.
///
/// Writes beyond the grid's row count fail the way the Sheets API does. Written
/// values are parsed like typed input, so a leading apostrophe is consumed as
/// the "store as text" marker and a leading `=` is recorded as a formula.
#[derive(Debug, Default)]
pub struct MemorySheet {
    sheets: Mutex<HashMap<String, Grid>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) a sheet with the given rows and a grid of `DEFAULT_GRID_ROWS`.
    pub fn with_sheet(self, title: &str, rows: Vec<Vec<String>>) -> Self {
        self.insert_sheet(title, rows, DEFAULT_GRID_ROWS);
        self
    }

    pub fn insert_sheet(&self, title: &str, rows: Vec<Vec<String>>, grid_rows: usize) {
        let mut sheets = self.lock();
        let sheet_id = sheets.len() as i64;
        sheets.insert(
            title.to_string(),
            Grid {
                sheet_id,
                row_count: grid_rows.max(rows.len()),
                cells: rows,
                validations: HashMap::new(),
                formulas: HashSet::new(),
            },
        );
    }

    pub fn set_validation(&self, title: &str, pos: CellPosition, rule: &str) {
        if let Some(grid) = self.lock().get_mut(title) {
            grid.validations.insert(pos, rule.to_string());
        }
    }

    pub fn validation_at(&self, title: &str, pos: CellPosition) -> Option<String> {
        self.lock()
            .get(title)
            .and_then(|g| g.validations.get(&pos).cloned())
    }

    /// Whether the cell holds a formula rather than literal text.
    pub fn is_formula(&self, title: &str, pos: CellPosition) -> bool {
        self.lock()
            .get(title)
            .is_some_and(|g| g.formulas.contains(&pos))
    }

    pub fn rows(&self, title: &str) -> Vec<Vec<String>> {
        self.lock().get(title).map(Grid::trimmed).unwrap_or_default()
    }

    pub fn row_count(&self, title: &str) -> usize {
        self.lock().get(title).map_or(0, |g| g.row_count)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Grid>> {
        // A poisoned map only means a test panicked mid-write; the data is still usable.
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SheetClient for MemorySheet {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let (title, cells) = split_range(range);
        let sheets = self.lock();
        let grid = sheets
            .get(&title)
            .ok_or_else(|| SheetError::SheetNotFound(title.clone()))?;
        let rows = grid.trimmed();

        let Some(cells) = cells else {
            return Ok(rows);
        };

        let (start, end) = match cells.split_once(':') {
            Some((s, e)) => (parse_cell(s)?, parse_cell(e).ok()),
            None => {
                let start = parse_cell(cells)?;
                (start, Some(start))
            }
        };

        let last_row = end.map_or(usize::MAX, |e| e.row);
        let last_col = end.map_or(usize::MAX, |e| e.column);
        let mut out: Vec<Vec<String>> = rows
            .iter()
            .enumerate()
            .filter(|(r, _)| *r >= start.row && *r <= last_row)
            .map(|(_, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(c, _)| *c >= start.column && *c <= last_col)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .collect();
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn write_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        let (title, cells) = split_range(range);
        let cells = cells.ok_or_else(|| SheetError::InvalidRange(range.to_string()))?;
        let start = parse_cell(cells.split(':').next().unwrap_or(cells))?;

        let mut sheets = self.lock();
        let grid = sheets
            .get_mut(&title)
            .ok_or_else(|| SheetError::SheetNotFound(title.clone()))?;

        if start.row + rows.len() > grid.row_count {
            return Err(SheetError::InvalidRange(format!(
                "{range} exceeds grid limits ({} rows)",
                grid.row_count
            )));
        }

        for (dr, row) in rows.into_iter().enumerate() {
            for (dc, value) in row.into_iter().enumerate() {
                grid.enter(
                    CellPosition {
                        row: start.row + dr,
                        column: start.column + dc,
                    },
                    value,
                );
            }
        }
        Ok(())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<CellPosition, SheetError> {
        let (title, _) = split_range(range);
        let mut sheets = self.lock();
        let grid = sheets
            .get_mut(&title)
            .ok_or_else(|| SheetError::SheetNotFound(title.clone()))?;

        // INSERT_ROWS: the row goes right after the data and the grid grows by one.
        let start = CellPosition {
            row: grid.trimmed().len(),
            column: 0,
        };
        grid.row_count = (grid.row_count + 1).max(start.row + 1);
        for (column, value) in row.into_iter().enumerate() {
            grid.enter(
                CellPosition {
                    row: start.row,
                    column,
                },
                value,
            );
        }
        Ok(start)
    }

    async fn sheet_id(&self, title: &str) -> Result<i64, SheetError> {
        self.lock()
            .get(title)
            .map(|g| g.sheet_id)
            .ok_or_else(|| SheetError::SheetNotFound(title.to_string()))
    }

    async fn copy_validation(
        &self,
        sheet_id: i64,
        from: CellPosition,
        to: CellPosition,
    ) -> Result<(), SheetError> {
        let mut sheets = self.lock();
        let grid = sheets
            .values_mut()
            .find(|g| g.sheet_id == sheet_id)
            .ok_or_else(|| SheetError::SheetNotFound(sheet_id.to_string()))?;
        match grid.validations.get(&from).cloned() {
            Some(rule) => {
                grid.validations.insert(to, rule);
            }
            None => {
                grid.validations.remove(&to);
            }
        }
        Ok(())
    }
}
