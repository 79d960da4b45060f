//! Tabular documents - the collaborator the readers and the annotator talk to.
//!
//! A document is a list of named sheets, each a sequence of physical rows of
//! cell text. Readers only need [`TabularDocument::rows`]; the annotator also
//! reads and writes single cells and persists the result.
//!
//! - [`Workbook`] - in-memory document backed by a CSV or XLSX file (or nothing)
//! - [`CsvRowSource`] - read-only CSV document that streams rows from disk
//! - [`csv`] / [`xlsx`] - codecs used by [`Workbook`]

pub mod csv;
pub mod workbook;
pub mod xlsx;

pub use self::csv::{CsvFormat, CsvRowSource, CSV_SHEET};
pub use workbook::{FileFormat, Sheet, Workbook};

use std::io::Write;
use std::path::Path;

use crate::error::{DocumentError, DocumentResult};
use crate::models::CellRef;

/// Lazily produced physical rows of one sheet, starting at row 1.
///
/// Every physical row is yielded, including blank ones, so the n-th item is
/// row n. An `Err` item is a row whose cells could not be read.
pub type RowIter<'a> = Box<dyn Iterator<Item = DocumentResult<Vec<String>>> + 'a>;

/// Operations the engine needs from a spreadsheet-like document.
pub trait TabularDocument {
    /// Sheet names in document order.
    fn sheet_names(&self) -> Vec<String>;

    /// Iterate the physical rows of a sheet.
    fn rows(&self, sheet: &str) -> DocumentResult<RowIter<'_>>;

    /// Text of one cell; empty for cells past the end of the data.
    fn cell(&self, sheet: &str, cell: CellRef) -> DocumentResult<String>;

    /// Overwrite the text of one cell.
    fn set_cell(&mut self, sheet: &str, cell: CellRef, value: &str) -> DocumentResult<()>;

    /// Persist to the location the document was opened from.
    fn save(&mut self) -> DocumentResult<()>;

    /// Serialize the document to a sink, leaving the original untouched.
    fn write_to(&self, sink: &mut dyn Write) -> DocumentResult<()>;
}

// =============================================================================
// Opening documents
// =============================================================================

/// Container type implied by a path's extension, if it names one.
pub fn format_from_extension(path: &Path) -> DocumentResult<Option<FileKind>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" | "tsv" | "txt" => Ok(Some(FileKind::Csv)),
        "xlsx" | "xlsm" => Ok(Some(FileKind::Xlsx)),
        "xls" | "xlsb" | "ods" => Err(DocumentError::UnsupportedFormat(ext)),
        _ => Ok(None),
    }
}

/// Container type implied by file content: a zip signature means XLSX.
pub fn sniff_format(bytes: &[u8]) -> FileKind {
    if bytes.starts_with(b"PK\x03\x04") {
        FileKind::Xlsx
    } else {
        FileKind::Csv
    }
}

/// Container family, before any CSV dialect detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
}

/// Load a whole document from disk.
pub fn open(path: impl AsRef<Path>) -> DocumentResult<Workbook> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let kind = match format_from_extension(path)? {
        Some(kind) => kind,
        None => sniff_format(&bytes),
    };

    let mut workbook = Workbook::from_bytes_as(&bytes, kind)?;
    workbook.set_path(path);
    tracing::debug!(
        path = %path.display(),
        sheets = workbook.sheet_count(),
        "Opened document"
    );
    Ok(workbook)
}

/// Load a whole document from memory. It has no backing file.
pub fn open_bytes(bytes: &[u8]) -> DocumentResult<Workbook> {
    Workbook::from_bytes_as(bytes, sniff_format(bytes))
}

/// Open a document for streaming.
///
/// CSV files are read row by row from disk; XLSX files are loaded whole.
pub fn open_streaming(path: impl AsRef<Path>) -> DocumentResult<Box<dyn TabularDocument>> {
    let path = path.as_ref();
    let kind = match format_from_extension(path)? {
        Some(kind) => kind,
        None => {
            let mut head = [0u8; 4];
            let n = std::io::Read::read(&mut std::fs::File::open(path)?, &mut head)?;
            sniff_format(&head[..n])
        }
    };

    match kind {
        FileKind::Csv => Ok(Box::new(CsvRowSource::open(path)?)),
        FileKind::Xlsx => Ok(Box::new(open(path)?)),
    }
}
