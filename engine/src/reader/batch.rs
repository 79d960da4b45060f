//! Batch reading: every row mapped, records and errors collected.

use std::path::Path;

use super::{prepare, Prepared, Reader, RowItem};
use crate::document::{self, TabularDocument};
use crate::error::{FieldError, ReadError};
use crate::mapping::RowMapper;
use crate::models::{ReadResult, RowError};

impl<'a, R: Default> Reader<'a, R> {
    /// Read every data row of the selected sheet.
    ///
    /// Row-level problems, including rows the document fails to deliver,
    /// end up in [`ReadResult::errors`]; only setup failures are returned
    /// as `Err`.
    pub fn read(&self, doc: &dyn TabularDocument) -> Result<ReadResult<R>, ReadError> {
        let Prepared {
            sheet,
            headers,
            mapping,
            rows,
        } = prepare(&*self.descriptor, &self.options, doc)?;

        let mapper = RowMapper::new(&*self.descriptor, &mapping)
            .with_headers(headers.as_ref())
            .with_validator(self.validator);

        let mut result = ReadResult::new();
        for item in rows {
            match item {
                RowItem::ReadFailed { row, error } => {
                    tracing::warn!(row, error = %error, "Failed to read row");
                    result
                        .errors
                        .push(RowError::row_only(row, FieldError::ReadRow(error.to_string())));
                }
                RowItem::Data { ctx, cells } => {
                    let outcome = mapper.map_row(&cells, ctx.row, ctx.logical);
                    result.errors.extend(outcome.errors);
                    if let Some(record) = outcome.record {
                        result.records.push(record);
                    }
                }
            }
        }

        tracing::info!(
            sheet = %sheet,
            records = result.records.len(),
            errors = result.errors.len(),
            "Read complete"
        );
        Ok(result)
    }

    /// Open a CSV or XLSX file and read it.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<ReadResult<R>, ReadError> {
        let workbook = document::open(path)?;
        self.read(&workbook)
    }

    /// Read a CSV or XLSX document held in memory.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<ReadResult<R>, ReadError> {
        let workbook = document::open_bytes(bytes)?;
        self.read(&workbook)
    }
}
