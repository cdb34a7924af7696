//! Column resolution, phone matching and row lookup over a sheet snapshot.
//!
//! Phone numbers match on their last [`PHONE_SUFFIX_LEN`] digits only, after
//! stripping everything that is not a digit. Stored contacts carry differing
//! country-code prefixes and punctuation, so full-number equality would miss
//! most real matches.

use thiserror::Error;

pub const PHONE_SUFFIX_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColumnError {
    #[error("\"{0}\" column not found")]
    NotFound(String),

    #[error("\"{0}\" column appears more than once")]
    Duplicate(String),
}

/// Zero-based index of the header that equals `name` exactly.
///
/// The header must appear exactly once; a missing or repeated column aborts the caller.
pub fn resolve_column(header: &[String], name: &str) -> Result<usize, ColumnError> {
    let mut hits = header
        .iter()
        .enumerate()
        .filter(|(_, h)| h.as_str() == name)
        .map(|(i, _)| i);

    let first = hits
        .next()
        .ok_or_else(|| ColumnError::NotFound(name.to_string()))?;
    if hits.next().is_some() {
        return Err(ColumnError::Duplicate(name.to_string()));
    }
    Ok(first)
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Splits a contact cell into its numbers (separated by `,` or `/`), trimmed, empties dropped.
pub fn split_contacts(cell: &str) -> Vec<&str> {
    cell.split([',', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The last four digits of a number, or `None` when it has fewer.
pub fn phone_key(raw: &str) -> Option<String> {
    let digits = digits_only(raw);
    if digits.len() < PHONE_SUFFIX_LEN {
        return None;
    }
    Some(digits[digits.len() - PHONE_SUFFIX_LEN..].to_string())
}

/// Whether `candidate` matches any number stored in `cell`.
pub fn phone_matches(cell: &str, candidate: &str) -> bool {
    let Some(wanted) = phone_key(candidate) else {
        return false;
    };
    split_contacts(cell)
        .into_iter()
        .filter_map(phone_key)
        .any(|key| key == wanted)
}

/// Index of the first data row whose `column` cell satisfies `predicate`.
pub fn locate_row<F>(rows: &[Vec<String>], column: usize, predicate: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    rows.iter()
        .position(|row| predicate(row.get(column).map(String::as_str).unwrap_or("")))
}

pub fn locate_by_name(rows: &[Vec<String>], name_column: usize, name: &str) -> Option<usize> {
    locate_row(rows, name_column, |cell| cell == name)
}

pub fn locate_by_phone(rows: &[Vec<String>], contact_column: usize, phone: &str) -> Option<usize> {
    locate_row(rows, contact_column, |cell| phone_matches(cell, phone))
}

/// Every data row whose contact cell matches `phone`.
///
/// More than one hit means two registrations raced past the lookup.
pub fn duplicate_rows(rows: &[Vec<String>], contact_column: usize, phone: &str) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| {
            row.get(contact_column)
                .is_some_and(|cell| phone_matches(cell, phone))
        })
        .map(|(i, _)| i)
        .collect()
}
