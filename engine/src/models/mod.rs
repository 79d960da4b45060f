//! Domain models shared by the readers and the error annotator.
//!
//! - [`RowError`] - one addressable problem on one row
//! - [`RowContext`] - physical and logical position of a delivered row
//! - [`ReadResult`] - records and row errors of a batch read
//! - [`CellRef`] - an `A1`-style cell address

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{DocumentError, FieldError};
use crate::mapping::columns::{column_index, column_letter};

// =============================================================================
// Cell Reference
// =============================================================================

/// Address of a single cell.
///
/// `column` is 0-based, `row` is the 1-based physical row, matching how
/// spreadsheets print addresses (`J4` is column 9, row 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub column: usize,
    pub row: usize,
}

impl CellRef {
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.column), self.row)
    }
}

impl FromStr for CellRef {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| DocumentError::InvalidCellRef(s.to_string()))?;
        let (letters, digits) = trimmed.split_at(split);

        let column =
            column_index(letters).ok_or_else(|| DocumentError::InvalidCellRef(s.to_string()))?;
        let row = digits
            .parse::<usize>()
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| DocumentError::InvalidCellRef(s.to_string()))?;

        Ok(Self { column, row })
    }
}

// =============================================================================
// Row Context
// =============================================================================

/// Where a delivered row sits in the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowContext {
    /// 1-based physical row, counting header and blank rows.
    pub row: usize,
    /// Logical data index; `None` for rows that failed to read.
    pub logical: Option<usize>,
}

// =============================================================================
// Row Error
// =============================================================================

/// A structured, addressable description of one problem on one row.
///
/// Row errors are created by the row mapper and the readers and are never
/// modified afterwards. They carry enough position information to be shown
/// to a user or written back into the source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based physical row.
    pub row: usize,
    /// Logical data index, or `None` when the row could not be read.
    pub logical_row: Option<usize>,
    /// 1-based column, or `None` when no column could be attributed.
    pub column: Option<usize>,
    /// Column letter matching `column`.
    pub column_letter: Option<String>,
    /// Record field name.
    pub field: Option<String>,
    /// Header text or configured display name of the column.
    pub column_name: Option<String>,
    /// Raw cell text.
    pub value: String,
    /// Underlying error.
    #[serde(serialize_with = "serialize_display")]
    pub error: FieldError,
}

impl RowError {
    /// Error with only a physical row, used for rows that could not be read.
    pub fn row_only(row: usize, error: FieldError) -> Self {
        Self {
            row,
            logical_row: None,
            column: None,
            column_letter: None,
            field: None,
            column_name: None,
            value: String::new(),
            error,
        }
    }

    /// The message written into annotation cells.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}", self.row)?;
        if let Some(letter) = &self.column_letter {
            write!(f, ", column {}", letter)?;
        }
        match (&self.column_name, self.value.is_empty()) {
            (Some(name), false) => write!(f, " ('{}', value '{}')", name, self.value)?,
            (Some(name), true) => write!(f, " ('{}')", name)?,
            (None, false) => write!(f, " (value '{}')", self.value)?,
            (None, true) => {}
        }
        write!(f, ": {}", self.error)
    }
}

impl std::error::Error for RowError {}

fn serialize_display<S: Serializer>(error: &FieldError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

// =============================================================================
// Read Result
// =============================================================================

/// Outcome of a batch read.
///
/// A row contributes either a record or errors, never both.
#[derive(Debug, Clone)]
pub struct ReadResult<R> {
    /// Successfully mapped records in sheet order.
    pub records: Vec<R>,
    /// Row errors in sheet order.
    pub errors: Vec<RowError>,
}

impl<R> ReadResult<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when no row produced an error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Distinct physical rows that produced at least one error.
    pub fn failed_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.dedup();
        rows
    }

    /// Get summary statistics.
    pub fn summary(&self) -> String {
        format!(
            "Mapped: {} records, {} errors on {} rows",
            self.records.len(),
            self.errors.len(),
            self.failed_rows().len()
        )
    }
}

impl<R> Default for ReadResult<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn test_cell_ref_display_and_parse() {
        let cell = CellRef::new(9, 4);
        assert_eq!(cell.to_string(), "J4");
        assert_eq!("J4".parse::<CellRef>().unwrap(), cell);
        assert_eq!("aa10".parse::<CellRef>().unwrap(), CellRef::new(26, 10));
    }

    #[test]
    fn test_cell_ref_rejects_garbage() {
        assert!("J".parse::<CellRef>().is_err());
        assert!("4".parse::<CellRef>().is_err());
        assert!("J0".parse::<CellRef>().is_err());
        assert!("J-4".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_row_error_display() {
        let err = RowError {
            row: 5,
            logical_row: Some(4),
            column: Some(3),
            column_letter: Some("C".into()),
            field: Some("price".into()),
            column_name: Some("Price".into()),
            value: "abc".into(),
            error: ConvertError::InvalidFloat("abc".into()).into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Row 5"));
        assert!(msg.contains("column C"));
        assert!(msg.contains("value 'abc'"));
        assert_eq!(err.message(), "invalid float: \"abc\"");
    }

    #[test]
    fn test_row_error_serializes_message() {
        let err = RowError::row_only(7, FieldError::ReadRow("truncated".into()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["row"], 7);
        assert_eq!(json["error"], "read row: truncated");
        assert!(json["column"].is_null());
    }

    #[test]
    fn test_read_result_summary() {
        let mut result: ReadResult<u8> = ReadResult::new();
        result.records.push(1);
        result.errors.push(RowError::row_only(3, FieldError::RequiredEmpty));
        result.errors.push(RowError::row_only(3, FieldError::RequiredOutOfRange));
        assert!(!result.is_clean());
        assert_eq!(result.failed_rows(), vec![3]);
        assert_eq!(result.summary(), "Mapped: 1 records, 2 errors on 1 rows");
    }
}
