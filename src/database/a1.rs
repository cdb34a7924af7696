//! A1 notation helpers for addressing cells on the attendee sheet.

use crate::database::sheet_client::{CellPosition, SheetError};

/// Converts a zero-based column index to spreadsheet letters (0 -> "A", 26 -> "AA").
pub fn column_letter(index: usize) -> String {
    // Columns are bijective base-26: A=1..Z=26, no zero digit.
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Inverse of [`column_letter`]. Returns `None` for empty or non-alphabetic input.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut col: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = (b.to_ascii_uppercase() - b'A') as usize + 1;
        col = col.checked_mul(26)?.checked_add(v)?;
    }
    Some(col - 1)
}

pub fn quote_sheet_name(name: &str) -> String {
    let escaped = name.replace('\'', "''");
    format!("'{escaped}'")
}

/// `'Sheet'!C5` for a zero-based row/column.
pub fn cell_range(sheet: &str, pos: CellPosition) -> String {
    format!(
        "{}!{}{}",
        quote_sheet_name(sheet),
        column_letter(pos.column),
        pos.row + 1
    )
}

/// `'Sheet'!A5:F5` covering `width` columns of one zero-based row.
pub fn row_range(sheet: &str, row: usize, width: usize) -> String {
    let last = column_letter(width.max(1) - 1);
    format!("{}!A{}:{}{}", quote_sheet_name(sheet), row + 1, last, row + 1)
}

/// Splits a range into its sheet title and the part after `!`.
///
/// A range without `!` names a whole sheet.
pub fn split_range(range: &str) -> (String, Option<&str>) {
    // Quoted names may contain '!', so find the separator after the closing quote.
    if let Some(rest) = range.strip_prefix('\'') {
        let mut title = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    title.push('\'');
                    chars.next();
                    continue;
                }
                let after = &rest[i + 1..];
                return (title, after.strip_prefix('!'));
            }
            title.push(c);
        }
        return (title, None);
    }

    match range.split_once('!') {
        Some((title, cells)) => (title.to_string(), Some(cells)),
        None => (range.to_string(), None),
    }
}

/// Parses `C5` into a zero-based position.
pub fn parse_cell(cell: &str) -> Result<CellPosition, SheetError> {
    let cell = cell.trim();
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| SheetError::InvalidRange(cell.to_string()))?;
    let (letters, digits) = cell.split_at(split);
    let column = column_index(letters).ok_or_else(|| SheetError::InvalidRange(cell.to_string()))?;
    let row: usize = digits
        .parse()
        .ok()
        .filter(|r| *r > 0)
        .ok_or_else(|| SheetError::InvalidRange(cell.to_string()))?;
    Ok(CellPosition {
        row: row - 1,
        column,
    })
}

/// Parses `'Sheet'!A5:F5` or `Sheet!C5` into the sheet title and the top-left cell.
pub fn parse_range_start(range: &str) -> Result<(String, CellPosition), SheetError> {
    let (title, cells) = split_range(range);
    let cells = cells.ok_or_else(|| SheetError::InvalidRange(range.to_string()))?;
    let start = cells.split(':').next().unwrap_or(cells);
    Ok((title, parse_cell(start)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letter_boundaries() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn column_index_inverts_letters() {
        for i in [0, 1, 25, 26, 51, 52, 701, 702, 16383] {
            assert_eq!(column_index(&column_letter(i)), Some(i));
        }
        assert_eq!(column_index("aa"), Some(26));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn cell_range_quotes_sheet_title() {
        let pos = CellPosition { row: 4, column: 2 };
        assert_eq!(cell_range("MYF attendees", pos), "'MYF attendees'!C5");
        assert_eq!(cell_range("Bob's", pos), "'Bob''s'!C5");
    }

    #[test]
    fn row_range_spans_width() {
        assert_eq!(row_range("Sheet1", 9, 6), "'Sheet1'!A10:F10");
        assert_eq!(row_range("Sheet1", 0, 0), "'Sheet1'!A1:A1");
    }

    #[test]
    fn split_range_handles_quotes_and_bare_titles() {
        assert_eq!(
            split_range("'MYF attendees'!B2"),
            ("MYF attendees".to_string(), Some("B2"))
        );
        assert_eq!(split_range("'it''s!'!A1"), ("it's!".to_string(), Some("A1")));
        assert_eq!(split_range("Sheet1!A:E"), ("Sheet1".to_string(), Some("A:E")));
        assert_eq!(split_range("MYF attendees"), ("MYF attendees".to_string(), None));
    }

    #[test]
    fn parse_range_start_reads_top_left_cell() {
        let (title, pos) = parse_range_start("'MYF attendees'!C7:H7").unwrap();
        assert_eq!(title, "MYF attendees");
        assert_eq!(pos, CellPosition { row: 6, column: 2 });

        assert!(parse_range_start("'MYF attendees'").is_err());
        assert!(parse_range_start("Sheet1!C0").is_err());
        assert!(parse_range_start("Sheet1!12").is_err());
    }
}
