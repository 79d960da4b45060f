//! Error write-back.
//!
//! Writes the message of each [`RowError`] into the configured error column
//! of its physical row. Existing cell text is kept; new messages are
//! appended on their own line, so running a file through several checks
//! accumulates every complaint.
//!
//! - [`annotate`] / [`annotate_to`] work on an open document
//! - [`write_errors`] / [`write_errors_to`] open the document themselves

use std::io::Write;
use std::path::Path;

use crate::document::{self, TabularDocument};
use crate::error::AnnotateResult;
use crate::mapping::column_letter;
use crate::models::{CellRef, RowError};
use crate::reader::ReadOptions;

/// Annotate `doc` and persist it to its backing file.
///
/// An empty error list leaves the document and its file untouched.
pub fn annotate(
    doc: &mut dyn TabularDocument,
    errors: &[RowError],
    options: &ReadOptions,
) -> AnnotateResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    write_cells(doc, errors, options)?;
    doc.save()?;
    Ok(())
}

/// Annotate `doc` and serialize the result to `sink`.
///
/// The document's backing file, if any, is not written.
pub fn annotate_to(
    doc: &mut dyn TabularDocument,
    errors: &[RowError],
    options: &ReadOptions,
    sink: &mut dyn Write,
) -> AnnotateResult<()> {
    if !errors.is_empty() {
        write_cells(doc, errors, options)?;
    }
    doc.write_to(sink)?;
    Ok(())
}

/// Open the file at `path`, annotate it and save it in place.
pub fn write_errors(
    path: impl AsRef<Path>,
    errors: &[RowError],
    options: &ReadOptions,
) -> AnnotateResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    options.write_back_column()?;

    let mut workbook = document::open(path)?;
    annotate(&mut workbook, errors, options)
}

/// Annotate a copy of `source` and write it to `sink`.
///
/// With no errors the source bytes are copied through unchanged.
pub fn write_errors_to(
    sink: &mut dyn Write,
    source: &[u8],
    errors: &[RowError],
    options: &ReadOptions,
) -> AnnotateResult<()> {
    if errors.is_empty() {
        sink.write_all(source)?;
        return Ok(());
    }
    options.write_back_column()?;

    let mut workbook = document::open_bytes(source)?;
    annotate_to(&mut workbook, errors, options, sink)
}

fn write_cells(
    doc: &mut dyn TabularDocument,
    errors: &[RowError],
    options: &ReadOptions,
) -> AnnotateResult<()> {
    let column = options.write_back_column()? - 1;
    let sheet = options.sheet.resolve(doc)?;

    let mut written = 0;
    for error in errors.iter().filter(|e| e.row > 0) {
        let cell = CellRef::new(column, error.row);
        let existing = doc.cell(&sheet, cell)?;
        let message = error.message();
        let text = if existing.is_empty() {
            message
        } else {
            format!("{}\n{}", existing, message)
        };
        doc.set_cell(&sheet, cell, &text)?;
        written += 1;
    }

    tracing::info!(
        sheet = %sheet,
        column = %column_letter(column),
        cells = written,
        "Annotated row errors"
    );
    Ok(())
}
