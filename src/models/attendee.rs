use std::fmt;

/// The attendee sheet as read in one request: header row plus data rows.
///
/// Data row `i` lives on sheet row `i + 2` (row 1 holds the headers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let rows = values.split_off(1);
        let header = values.pop().unwrap_or_default();
        Self { header, rows }
    }

    /// Zero-based grid row of a data row.
    pub fn grid_row(data_index: usize) -> usize {
        data_index + 1
    }

    pub fn cell(&self, data_index: usize, column: usize) -> &str {
        self.rows
            .get(data_index)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendeeStatus {
    Registered,
    Present,
}

impl AttendeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeeStatus::Registered => "Registered",
            AttendeeStatus::Present => "Present",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Registered" => Some(AttendeeStatus::Registered),
            "Present" => Some(AttendeeStatus::Present),
            _ => None,
        }
    }

    /// Present outranks Registered; a registration never undoes attendance.
    pub fn supersedes(&self, current: Option<AttendeeStatus>) -> bool {
        !matches!(
            (self, current),
            (AttendeeStatus::Registered, Some(AttendeeStatus::Present))
        ) && current != Some(*self)
    }
}

impl fmt::Display for AttendeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new attendee row, before it is laid out against the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendee {
    pub name: String,
    pub gender: String,
    pub contact: String,
    pub location: String,
    pub status: AttendeeStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn snapshot_splits_header_from_data() {
        let snap = SheetSnapshot::from_values(vec![
            row(&["Name", "Contact"]),
            row(&["Alice", "9876543210"]),
            row(&["Bob"]),
        ]);
        assert_eq!(snap.header, row(&["Name", "Contact"]));
        assert_eq!(snap.rows.len(), 2);
        assert_eq!(snap.cell(1, 1), "");
        assert_eq!(SheetSnapshot::grid_row(1), 2);
    }

    #[test]
    fn empty_sheet_has_no_header() {
        let snap = SheetSnapshot::from_values(vec![]);
        assert!(snap.header.is_empty());
        assert!(snap.rows.is_empty());
    }

    #[test]
    fn registration_never_downgrades_presence() {
        use AttendeeStatus::*;
        assert!(Registered.supersedes(None));
        assert!(Present.supersedes(Some(Registered)));
        assert!(!Registered.supersedes(Some(Present)));
        assert!(!Present.supersedes(Some(Present)));
    }
}
