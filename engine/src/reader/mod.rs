//! Batch and streaming readers.
//!
//! Both readers share the same setup and row selection:
//!
//! 1. resolve the sheet (name wins over index)
//! 2. read the header row, if one is configured, into a [`HeaderIndex`]
//! 3. resolve the [`ColumnMapping`] once for the whole sheet
//! 4. walk the physical rows, skipping rows before the first data row and
//!    fully blank rows, numbering the rest with logical indexes
//!
//! The batch reader collects records and row errors; the streaming reader
//! hands every row to a [`RowHandler`] that may stop the stream.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetbind::{Reader, ReadOptions};
//!
//! let result = Reader::<Product>::new(ReadOptions::default().sheet("Products"))
//!     .read_file("products.xlsx")?;
//! println!("{}", result.summary());
//! ```

mod batch;
pub mod options;
mod stream;

pub use options::{ReadOptions, RowIndexMapper, SheetSelector};
pub use stream::RowHandler;

use std::path::Path;
use std::sync::Arc;

use crate::cache::DescriptorRegistry;
use crate::document::{RowIter, TabularDocument};
use crate::error::{BoxError, DocumentError, ReadError, StreamFailure};
use crate::mapping::{ColumnMapping, HeaderIndex};
use crate::models::{ReadResult, RowContext, RowError};
use crate::schema::{Record, TypeDescriptor};
use crate::validation::Validator;

/// Typed reader for one record type.
///
/// Built once per read with the options, an optional validator and, for
/// streaming, a row handler.
pub struct Reader<'a, R> {
    descriptor: Arc<TypeDescriptor<R>>,
    options: ReadOptions,
    validator: Option<&'a dyn Validator<R>>,
    handler: Option<Box<dyn RowHandler<R> + 'a>>,
}

impl<'a, R: Record> Reader<'a, R> {
    /// Reader using the process-wide descriptor registry.
    pub fn new(options: ReadOptions) -> Self {
        Self::with_registry(DescriptorRegistry::global(), options)
    }

    /// Reader using an explicit descriptor registry.
    pub fn with_registry(registry: &DescriptorRegistry, options: ReadOptions) -> Self {
        Self::with_descriptor(registry.descriptor::<R>(), options)
    }
}

impl<'a, R: Default> Reader<'a, R> {
    /// Reader for a descriptor built elsewhere, e.g. from a profile.
    pub fn with_descriptor(descriptor: Arc<TypeDescriptor<R>>, options: ReadOptions) -> Self {
        Self {
            descriptor,
            options,
            validator: None,
            handler: None,
        }
    }

    /// Validate every populated record.
    pub fn validator(mut self, validator: &'a dyn Validator<R>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Stream handler as a closure.
    pub fn on_row<F>(self, f: F) -> Self
    where
        F: FnMut(&RowContext, Option<R>, &[RowError]) -> Result<(), BoxError> + 'a,
    {
        self.handler(f)
    }

    /// Stream handler.
    pub fn handler(mut self, handler: impl RowHandler<R> + 'a) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn descriptor(&self) -> &TypeDescriptor<R> {
        &self.descriptor
    }
}

// =============================================================================
// Shared setup and row selection
// =============================================================================

/// Everything resolved before the first data row is read.
struct Prepared<'d> {
    sheet: String,
    headers: Option<HeaderIndex>,
    mapping: ColumnMapping,
    rows: DataRows<'d>,
}

fn prepare<'d, R>(
    descriptor: &TypeDescriptor<R>,
    options: &ReadOptions,
    doc: &'d dyn TabularDocument,
) -> Result<Prepared<'d>, ReadError> {
    options.validate()?;
    let sheet = options.sheet.resolve(doc)?;
    let mut rows = doc.rows(&sheet)?;

    let mut physical = 0;
    let headers = if options.has_header() {
        let mut found = None;
        while found.is_none() {
            let Some(row) = rows.next() else { break };
            physical += 1;
            let cells = row?;
            if physical == options.header_row {
                found = Some(HeaderIndex::from_cells(&cells));
            }
        }
        Some(found.ok_or(ReadError::HeaderNotFound(options.header_row))?)
    } else {
        None
    };

    let mapping = ColumnMapping::resolve(descriptor, headers.as_ref());
    let missing = mapping.unmapped_required(descriptor);
    if !missing.is_empty() {
        tracing::warn!(
            sheet = %sheet,
            fields = ?missing,
            "Required fields have no column; every data row will report them"
        );
    }
    tracing::info!(
        sheet = %sheet,
        record = descriptor.type_name(),
        mapped = mapping.mapped_count(),
        fields = descriptor.len(),
        "Column mapping resolved"
    );

    Ok(Prepared {
        sheet,
        headers,
        mapping,
        rows: DataRows {
            rows,
            row: physical,
            start: options.data_start(),
            count: 0,
            options: options.clone(),
        },
    })
}

/// One physical row selected for mapping.
enum RowItem {
    /// The document could not deliver the row's cells.
    ReadFailed { row: usize, error: DocumentError },
    Data { ctx: RowContext, cells: Vec<String> },
}

/// Skips rows before the data start and blank rows; numbers the rest.
struct DataRows<'d> {
    rows: RowIter<'d>,
    row: usize,
    start: usize,
    count: usize,
    options: ReadOptions,
}

impl Iterator for DataRows<'_> {
    type Item = RowItem;

    fn next(&mut self) -> Option<RowItem> {
        loop {
            let item = self.rows.next()?;
            self.row += 1;
            let row = self.row;

            let cells = match item {
                Ok(cells) => cells,
                Err(error) => return Some(RowItem::ReadFailed { row, error }),
            };
            if row < self.start {
                continue;
            }
            if cells.iter().all(|c| c.trim().is_empty()) {
                tracing::debug!(row, "Skipped blank row");
                continue;
            }

            self.count += 1;
            let logical = self.options.logical_index(row, self.count);
            return Some(RowItem::Data {
                ctx: RowContext {
                    row,
                    logical: Some(logical),
                },
                cells,
            });
        }
    }
}

// =============================================================================
// Convenience entry points
// =============================================================================

/// Read a file into records of `R`.
pub fn read_file<R: Record>(
    path: impl AsRef<Path>,
    options: ReadOptions,
) -> Result<ReadResult<R>, ReadError> {
    Reader::<R>::new(options).read_file(path)
}

/// Read an in-memory document into records of `R`.
pub fn read_bytes<R: Record>(bytes: &[u8], options: ReadOptions) -> Result<ReadResult<R>, ReadError> {
    Reader::<R>::new(options).read_bytes(bytes)
}

/// Stream a file row by row, writing errors back when an error column is set.
pub fn stream_file<R, F>(
    path: impl AsRef<Path>,
    options: ReadOptions,
    handler: F,
) -> Result<Vec<RowError>, StreamFailure>
where
    R: Record,
    F: FnMut(&RowContext, Option<R>, &[RowError]) -> Result<(), BoxError>,
{
    Reader::<R>::new(options).on_row(handler).stream_file(path)
}

/// Stream an in-memory document row by row.
pub fn stream_bytes<R, F>(
    bytes: &[u8],
    options: ReadOptions,
    handler: F,
) -> Result<Vec<RowError>, StreamFailure>
where
    R: Record,
    F: FnMut(&RowContext, Option<R>, &[RowError]) -> Result<(), BoxError>,
{
    Reader::<R>::new(options).on_row(handler).stream_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Sheet, Workbook};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn sheet(rows: Vec<Vec<String>>) -> Workbook {
        let mut wb = Workbook::new();
        wb.add_sheet(Sheet::with_rows("Data", rows));
        wb
    }

    #[derive(Debug, Default)]
    struct Nothing;

    fn empty_descriptor() -> TypeDescriptor<Nothing> {
        TypeDescriptor::new("Nothing", Vec::new())
    }

    #[test]
    fn test_data_rows_skip_blank_and_number_logically() {
        let wb = sheet(vec![
            strings(&["h"]),
            strings(&["a"]),
            strings(&["  ", ""]),
            Vec::new(),
            strings(&["b"]),
        ]);
        let prepared = prepare(&empty_descriptor(), &ReadOptions::default(), &wb).unwrap();
        assert_eq!(prepared.sheet, "Data");
        assert!(prepared.headers.is_some());

        let ctxs: Vec<RowContext> = prepared
            .rows
            .filter_map(|item| match item {
                RowItem::Data { ctx, .. } => Some(ctx),
                RowItem::ReadFailed { .. } => None,
            })
            .collect();
        assert_eq!(
            ctxs,
            vec![
                RowContext { row: 2, logical: Some(1) },
                RowContext { row: 5, logical: Some(2) },
            ]
        );
    }

    #[test]
    fn test_header_not_found() {
        let wb = sheet(vec![strings(&["only row"])]);
        let err = prepare(&empty_descriptor(), &ReadOptions::default().header(3), &wb)
            .err()
            .unwrap();
        assert!(matches!(err, ReadError::HeaderNotFound(3)));
        assert_eq!(err.to_string(), "header row 3 not found");
    }

    #[test]
    fn test_start_row_and_mapper() {
        let wb = sheet(vec![
            strings(&["title"]),
            strings(&["h"]),
            strings(&["skip me"]),
            strings(&["x"]),
        ]);
        let options = ReadOptions::default()
            .header(2)
            .start_row(4)
            .row_index_mapper(|row, count| row * 10 + count);
        let prepared = prepare(&empty_descriptor(), &options, &wb).unwrap();
        let items: Vec<RowItem> = prepared.rows.collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            RowItem::Data { ctx: RowContext { row: 4, logical: Some(41) }, .. }
        ));
    }

    #[test]
    fn test_no_header_starts_at_row_two_by_default() {
        let wb = sheet(vec![strings(&["first"]), strings(&["second"])]);
        let prepared = prepare(&empty_descriptor(), &ReadOptions::default().header(0), &wb).unwrap();
        assert!(prepared.headers.is_none());
        assert_eq!(prepared.rows.count(), 1);
    }
}
