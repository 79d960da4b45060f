//! Read options shared by every entry point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::document::xlsx::MAX_COLS;
use crate::document::TabularDocument;
use crate::error::{ConfigError, DocumentError, DocumentResult};

/// Computes the logical index from `(physical_row, sequential_count)`.
pub type RowIndexMapper = Arc<dyn Fn(usize, usize) -> usize + Send + Sync>;

/// Which sheet to read. A name wins over the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSelector {
    pub name: Option<String>,
    /// 0-based position in the document's sheet list.
    pub index: usize,
}

impl SheetSelector {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            index: 0,
        }
    }

    pub fn at(index: usize) -> Self {
        Self { name: None, index }
    }

    /// Resolve to a sheet name present in the document.
    pub fn resolve(&self, doc: &dyn TabularDocument) -> DocumentResult<String> {
        let names = doc.sheet_names();
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return names
                .into_iter()
                .find(|n| n == name)
                .ok_or_else(|| DocumentError::SheetNotFound(name.to_string()));
        }

        if names.is_empty() {
            return Err(DocumentError::NoSheets);
        }
        let count = names.len();
        names
            .into_iter()
            .nth(self.index)
            .ok_or(DocumentError::SheetIndexOutOfRange {
                index: self.index,
                count,
            })
    }
}

/// Configuration consumed by the readers and the annotator.
///
/// ```ignore
/// let options = ReadOptions::default()
///     .sheet("Products")
///     .header(2)
///     .error_column(10);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub sheet: SheetSelector,
    /// 1-based header row; `0` means the sheet has no header.
    pub header_row: usize,
    /// 1-based first data row; defaults to the row after the header.
    pub first_data_row: Option<usize>,
    /// 1-based column receiving error messages on write-back.
    pub error_column: Option<usize>,
    #[serde(skip)]
    pub row_index: Option<RowIndexMapper>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::default(),
            header_row: 1,
            first_data_row: None,
            error_column: None,
            row_index: None,
        }
    }
}

impl ReadOptions {
    pub fn sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet.name = Some(name.into());
        self
    }

    pub fn sheet_at(mut self, index: usize) -> Self {
        self.sheet.index = index;
        self
    }

    /// Header row number; `0` disables header matching.
    pub fn header(mut self, row: usize) -> Self {
        self.header_row = row;
        self
    }

    pub fn start_row(mut self, row: usize) -> Self {
        self.first_data_row = Some(row);
        self
    }

    pub fn error_column(mut self, column: usize) -> Self {
        self.error_column = Some(column);
        self
    }

    /// Replace sequential logical numbering with `f(physical_row, count)`.
    pub fn row_index_mapper<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) -> usize + Send + Sync + 'static,
    {
        self.row_index = Some(Arc::new(f));
        self
    }

    pub fn has_header(&self) -> bool {
        self.header_row > 0
    }

    /// First physical row holding data.
    pub fn data_start(&self) -> usize {
        self.first_data_row
            .unwrap_or(if self.has_header() { self.header_row + 1 } else { 2 })
    }

    /// Reject layouts where data would start on or above the header.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let start = self.data_start();
        if start == 0 || (self.has_header() && start <= self.header_row) {
            return Err(ConfigError::InvalidLayout {
                header_row: self.header_row,
                first_data_row: start,
            });
        }
        match self.error_column {
            Some(column) if column > MAX_COLS => Err(ConfigError::ErrorColumnOutOfRange {
                column,
                max: MAX_COLS,
            }),
            _ => Ok(()),
        }
    }

    /// Positive error column within the sheet limit, required for write-back.
    pub fn write_back_column(&self) -> Result<usize, ConfigError> {
        let column = self
            .error_column
            .filter(|c| *c > 0)
            .ok_or(ConfigError::MissingErrorColumn)?;
        if column > MAX_COLS {
            return Err(ConfigError::ErrorColumnOutOfRange {
                column,
                max: MAX_COLS,
            });
        }
        Ok(column)
    }

    /// Logical index of a data row given its 1-based sequential count.
    pub fn logical_index(&self, physical_row: usize, count: usize) -> usize {
        match &self.row_index {
            Some(f) => f(physical_row, count),
            None => count,
        }
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("sheet", &self.sheet)
            .field("header_row", &self.header_row)
            .field("first_data_row", &self.first_data_row)
            .field("error_column", &self.error_column)
            .field("row_index", &self.row_index.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Sheet, Workbook};

    fn workbook(names: &[&str]) -> Workbook {
        let mut wb = Workbook::new();
        for name in names {
            wb.add_sheet(Sheet::new(*name));
        }
        wb
    }

    #[test]
    fn test_defaults() {
        let options = ReadOptions::default();
        assert_eq!(options.header_row, 1);
        assert_eq!(options.data_start(), 2);
        assert!(options.validate().is_ok());
        assert_eq!(options.logical_index(7, 3), 3);

        let headerless = ReadOptions::default().header(0);
        assert_eq!(headerless.data_start(), 2);
        assert_eq!(ReadOptions::default().header(3).data_start(), 4);
    }

    #[test]
    fn test_invalid_layout() {
        let options = ReadOptions::default().header(3).start_row(3);
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidLayout { header_row: 3, first_data_row: 3 })
        ));
        assert!(ReadOptions::default().header(0).start_row(0).validate().is_err());
        assert!(ReadOptions::default().header(0).start_row(1).validate().is_ok());
    }

    #[test]
    fn test_write_back_column() {
        assert_eq!(
            ReadOptions::default().write_back_column(),
            Err(ConfigError::MissingErrorColumn)
        );
        assert_eq!(
            ReadOptions::default().error_column(0).write_back_column(),
            Err(ConfigError::MissingErrorColumn)
        );
        assert_eq!(ReadOptions::default().error_column(10).write_back_column(), Ok(10));
        assert_eq!(
            ReadOptions::default().error_column(MAX_COLS).write_back_column(),
            Ok(MAX_COLS)
        );
        assert_eq!(
            ReadOptions::default().error_column(usize::MAX).write_back_column(),
            Err(ConfigError::ErrorColumnOutOfRange {
                column: usize::MAX,
                max: MAX_COLS
            })
        );
        assert!(ReadOptions::default().error_column(MAX_COLS + 1).validate().is_err());
    }

    #[test]
    fn test_row_index_mapper() {
        let options = ReadOptions::default().row_index_mapper(|row, count| row * 100 + count);
        assert_eq!(options.logical_index(4, 2), 402);
        assert!(format!("{:?}", options).contains("<fn>"));
    }

    #[test]
    fn test_sheet_selector() {
        let wb = workbook(&["First", "Second"]);
        assert_eq!(SheetSelector::default().resolve(&wb).unwrap(), "First");
        assert_eq!(SheetSelector::at(1).resolve(&wb).unwrap(), "Second");

        let both = SheetSelector {
            name: Some("First".into()),
            index: 1,
        };
        assert_eq!(both.resolve(&wb).unwrap(), "First");

        assert!(matches!(
            SheetSelector::named("Third").resolve(&wb),
            Err(DocumentError::SheetNotFound(_))
        ));
        assert!(matches!(
            SheetSelector::at(2).resolve(&wb),
            Err(DocumentError::SheetIndexOutOfRange { index: 2, count: 2 })
        ));
        assert!(matches!(
            SheetSelector::default().resolve(&workbook(&[])),
            Err(DocumentError::NoSheets)
        ));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ReadOptions =
            serde_json::from_str(r#"{ "sheet": { "name": "Data" }, "error_column": 5 }"#).unwrap();
        assert_eq!(options.sheet.name.as_deref(), Some("Data"));
        assert_eq!(options.header_row, 1);
        assert_eq!(options.error_column, Some(5));
    }
}
