//! In-memory workbook.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::csv::{self as csv_codec, CsvFormat, CSV_SHEET};
use super::{xlsx, FileKind, RowIter, TabularDocument};
use crate::error::{DocumentError, DocumentResult};
use crate::models::CellRef;

/// How a workbook is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv(CsvFormat),
    Xlsx,
}

/// A named grid of cell text. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text, empty when outside the data.
    pub fn get(&self, cell: CellRef) -> &str {
        cell.row
            .checked_sub(1)
            .and_then(|r| self.rows.get(r))
            .and_then(|row| row.get(cell.column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Set cell text, growing the grid as needed up to the XLSX limits.
    pub fn set(&mut self, cell: CellRef, value: impl Into<String>) -> DocumentResult<()> {
        let r = cell
            .row
            .checked_sub(1)
            .filter(|_| cell.row <= xlsx::MAX_ROWS && cell.column < xlsx::MAX_COLS)
            .ok_or_else(|| DocumentError::InvalidCellRef(cell.to_string()))?;
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let row = &mut self.rows[r];
        if row.len() <= cell.column {
            row.resize(cell.column + 1, String::new());
        }
        row[cell.column] = value.into();
        Ok(())
    }

    /// Append one row after the last.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Whole document held in memory.
///
/// Opened from CSV or XLSX, or built from scratch. Saving writes the same
/// container type back to the path the workbook was opened from.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    format: FileFormat,
    path: Option<PathBuf>,
}

impl Workbook {
    /// Empty XLSX workbook without a backing file.
    pub fn new() -> Self {
        Self::with_format(FileFormat::Xlsx)
    }

    pub fn with_format(format: FileFormat) -> Self {
        Self {
            sheets: Vec::new(),
            format,
            path: None,
        }
    }

    pub(crate) fn from_bytes_as(bytes: &[u8], kind: FileKind) -> DocumentResult<Self> {
        match kind {
            FileKind::Csv => {
                let (rows, format) = csv_codec::parse(bytes)?;
                Ok(Self {
                    sheets: vec![Sheet::with_rows(CSV_SHEET, rows)],
                    format: FileFormat::Csv(format),
                    path: None,
                })
            }
            FileKind::Xlsx => Ok(Self {
                sheets: xlsx::read(bytes)?,
                format: FileFormat::Xlsx,
                path: None,
            }),
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Sheet by name, created at the end if missing.
    pub fn sheet_or_insert(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Serialize in this workbook's container format.
    pub fn to_bytes(&self) -> DocumentResult<Vec<u8>> {
        match self.format {
            FileFormat::Xlsx => xlsx::write(&self.sheets),
            FileFormat::Csv(format) => match self.sheets.as_slice() {
                [] => csv_codec::write(&[], format),
                [sheet] => csv_codec::write(sheet.rows(), format),
                _ => Err(DocumentError::UnsupportedFormat(format!(
                    "CSV holds one sheet, workbook has {}",
                    self.sheets.len()
                ))),
            },
        }
    }

    /// Write to a new path and make it the backing file.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> DocumentResult<()> {
        self.path = Some(path.into());
        self.save()
    }

    fn sheet_or_err(&self, name: &str) -> DocumentResult<&Sheet> {
        self.sheet(name)
            .ok_or_else(|| DocumentError::SheetNotFound(name.to_string()))
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularDocument for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn rows(&self, sheet: &str) -> DocumentResult<RowIter<'_>> {
        let sheet = self.sheet_or_err(sheet)?;
        Ok(Box::new(sheet.rows.iter().map(|row| Ok(row.clone()))))
    }

    fn cell(&self, sheet: &str, cell: CellRef) -> DocumentResult<String> {
        Ok(self.sheet_or_err(sheet)?.get(cell).to_string())
    }

    fn set_cell(&mut self, sheet: &str, cell: CellRef, value: &str) -> DocumentResult<()> {
        self.sheet_mut(sheet)
            .ok_or_else(|| DocumentError::SheetNotFound(sheet.to_string()))?
            .set(cell, value)
    }

    fn save(&mut self) -> DocumentResult<()> {
        let path = self.path.as_ref().ok_or(DocumentError::NoBackingFile)?;
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        tracing::debug!(path = %path.display(), "Saved document");
        Ok(())
    }

    fn write_to(&self, sink: &mut dyn Write) -> DocumentResult<()> {
        sink.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellRef {
        s.parse().unwrap()
    }

    #[test]
    fn test_sheet_set_grows_grid() {
        let mut sheet = Sheet::new("S");
        sheet.set(cell("C3"), "x").unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.rows()[2], vec!["", "", "x"]);
        assert_eq!(sheet.get(cell("C3")), "x");
        assert_eq!(sheet.get(cell("Z99")), "");
    }

    #[test]
    fn test_sheet_set_rejects_cells_past_limits() {
        let mut sheet = Sheet::new("S");
        sheet.set(CellRef::new(xlsx::MAX_COLS - 1, 1), "last").unwrap();
        assert!(matches!(
            sheet.set(CellRef::new(xlsx::MAX_COLS, 1), "x"),
            Err(DocumentError::InvalidCellRef(_))
        ));
        assert!(matches!(
            sheet.set(CellRef::new(usize::MAX, 1), "x"),
            Err(DocumentError::InvalidCellRef(_))
        ));
        assert!(sheet.set(CellRef::new(0, xlsx::MAX_ROWS + 1), "x").is_err());
        assert_eq!(sheet.row_count(), 1);
    }

    #[test]
    fn test_workbook_cells_by_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet(Sheet::new("Data"));
        wb.set_cell("Data", cell("B2"), "hello").unwrap();
        assert_eq!(wb.cell("Data", cell("B2")).unwrap(), "hello");
        assert!(matches!(
            wb.cell("Missing", cell("A1")),
            Err(DocumentError::SheetNotFound(_))
        ));
        assert!(matches!(wb.save(), Err(DocumentError::NoBackingFile)));
    }

    #[test]
    fn test_rows_yield_every_physical_row() {
        let mut wb = Workbook::new();
        wb.add_sheet(Sheet::with_rows(
            "S",
            vec![vec!["h".into()], vec![], vec!["v".into()]],
        ));
        let rows: Vec<Vec<String>> = wb.rows("S").unwrap().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());
    }

    #[test]
    fn test_csv_workbook_refuses_second_sheet() {
        let mut wb = Workbook::with_format(FileFormat::Csv(CsvFormat::default()));
        wb.sheet_or_insert("One").push_row(vec!["a".into()]);
        assert!(wb.to_bytes().is_ok());
        wb.sheet_or_insert("Two");
        assert!(matches!(
            wb.to_bytes(),
            Err(DocumentError::UnsupportedFormat(_))
        ));
    }
}
