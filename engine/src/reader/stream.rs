//! Streaming reading: one handler call per data row.

use std::path::Path;

use super::{prepare, Prepared, Reader, RowItem};
use crate::annotate;
use crate::document::{self, TabularDocument};
use crate::error::{BoxError, ConfigError, FieldError, ReadError, StreamFailure};
use crate::mapping::RowMapper;
use crate::models::{RowContext, RowError};

/// Receives each data row of a stream.
///
/// `record` is `Some` only when the row mapped and validated without
/// errors. Returning `Err` stops the stream; that error comes back to the
/// caller unchanged inside [`ReadError::Handler`].
pub trait RowHandler<R> {
    fn handle(&mut self, ctx: &RowContext, record: Option<R>, errors: &[RowError]) -> Result<(), BoxError>;
}

impl<R, F> RowHandler<R> for F
where
    F: FnMut(&RowContext, Option<R>, &[RowError]) -> Result<(), BoxError>,
{
    fn handle(&mut self, ctx: &RowContext, record: Option<R>, errors: &[RowError]) -> Result<(), BoxError> {
        self(ctx, record, errors)
    }
}

impl<'a, R: Default> Reader<'a, R> {
    /// Stream every data row of the selected sheet to the row handler.
    ///
    /// Rows the document fails to deliver reach the handler with no
    /// logical index and no record. On success the accumulated row errors
    /// are returned; a handler error stops the stream and is returned with
    /// the errors seen so far, the stopping row included.
    pub fn stream(&mut self, doc: &dyn TabularDocument) -> Result<Vec<RowError>, StreamFailure> {
        let Reader {
            descriptor,
            options,
            validator,
            handler,
        } = self;
        let handler = handler
            .as_mut()
            .ok_or_else(|| StreamFailure::setup(ConfigError::MissingHandler))?;

        let Prepared {
            sheet,
            headers,
            mapping,
            rows,
        } = prepare(&**descriptor, options, doc)?;

        let mapper = RowMapper::new(&**descriptor, &mapping)
            .with_headers(headers.as_ref())
            .with_validator(*validator);

        let mut all = Vec::new();
        for item in rows {
            let (ctx, outcome) = match item {
                RowItem::ReadFailed { row, error } => {
                    tracing::warn!(row, error = %error, "Failed to read row");
                    let err = RowError::row_only(row, FieldError::ReadRow(error.to_string()));
                    (RowContext { row, logical: None }, (None, vec![err]))
                }
                RowItem::Data { ctx, cells } => {
                    let outcome = mapper.map_row(&cells, ctx.row, ctx.logical);
                    (ctx, (outcome.record, outcome.errors))
                }
            };

            let (record, errors) = outcome;
            let handled = handler.handle(&ctx, record, &errors);
            all.extend(errors);

            if let Err(error) = handled {
                tracing::warn!(sheet = %sheet, row = ctx.row, error = %error, "Row handler stopped the stream");
                return Err(StreamFailure {
                    error: ReadError::Handler { row: ctx.row, error },
                    row_errors: all,
                });
            }
        }

        tracing::info!(sheet = %sheet, errors = all.len(), "Stream complete");
        Ok(all)
    }

    /// Stream a CSV or XLSX file.
    ///
    /// CSV files are read from disk row by row. When an error column is
    /// configured and the stream produced row errors, they are written
    /// back into the file afterwards.
    pub fn stream_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<RowError>, StreamFailure> {
        if self.handler.is_none() {
            return Err(StreamFailure::setup(ConfigError::MissingHandler));
        }

        let path = path.as_ref();
        let doc = document::open_streaming(path).map_err(StreamFailure::setup)?;
        let errors = self.stream(&*doc)?;
        drop(doc);

        if self.options.error_column.is_some_and(|c| c > 0) && !errors.is_empty() {
            if let Err(e) = annotate::write_errors(path, &errors, &self.options) {
                return Err(StreamFailure {
                    error: ReadError::Annotate(e),
                    row_errors: errors,
                });
            }
            tracing::info!(path = %path.display(), errors = errors.len(), "Wrote row errors back");
        }

        Ok(errors)
    }

    /// Stream a CSV or XLSX document held in memory.
    pub fn stream_bytes(&mut self, bytes: &[u8]) -> Result<Vec<RowError>, StreamFailure> {
        if self.handler.is_none() {
            return Err(StreamFailure::setup(ConfigError::MissingHandler));
        }
        let workbook = document::open_bytes(bytes).map_err(StreamFailure::setup)?;
        self.stream(&workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Sheet, Workbook};
    use crate::field;
    use crate::models::CellRef;
    use crate::reader::ReadOptions;
    use crate::schema::{Record, TypeDescriptor};
    use std::fmt;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Order {
        id: u32,
        customer: String,
    }

    impl Record for Order {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::new(
                "Order",
                vec![
                    field!(Order, id).header("ID").required(),
                    field!(Order, customer).header("Customer"),
                ],
            )
        }
    }

    #[derive(Debug)]
    struct Stop;

    impl fmt::Display for Stop {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stop here")
        }
    }

    impl std::error::Error for Stop {}

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn orders() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_sheet(Sheet::with_rows(
            "Orders",
            vec![
                strings(&["ID", "Customer"]),
                strings(&["1", "Ann"]),
                strings(&["x", "Bob"]),
                strings(&["3", "Cy"]),
                strings(&["4", "Di"]),
            ],
        ));
        wb
    }

    #[test]
    fn test_stream_delivers_every_row() {
        let mut seen = Vec::new();
        let errors = Reader::<Order>::new(ReadOptions::default())
            .on_row(|ctx: &RowContext, record: Option<Order>, errors: &[RowError]| {
                seen.push((ctx.logical, record.map(|o| o.customer), errors.len()));
                Ok(())
            })
            .stream(&orders())
            .unwrap();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 3);
        assert_eq!(
            seen,
            vec![
                (Some(1), Some("Ann".to_string()), 0),
                (Some(2), None, 1),
                (Some(3), Some("Cy".to_string()), 0),
                (Some(4), Some("Di".to_string()), 0),
            ]
        );
    }

    #[test]
    fn test_handler_error_stops_the_stream() {
        let mut calls = 0;
        let failure = Reader::<Order>::new(ReadOptions::default())
            .on_row(|ctx: &RowContext, _record: Option<Order>, _errors: &[RowError]| {
                calls += 1;
                if ctx.logical == Some(3) {
                    return Err(Box::new(Stop) as BoxError);
                }
                Ok(())
            })
            .stream(&orders())
            .unwrap_err();

        assert_eq!(calls, 3);
        assert!(matches!(failure.error, ReadError::Handler { row: 4, .. }));
        let inner = failure.error.handler_error().unwrap();
        assert!(inner.downcast_ref::<Stop>().is_some());
        assert_eq!(inner.to_string(), "stop here");
        // errors from rows before the stop are kept
        assert_eq!(failure.row_errors.len(), 1);
        assert_eq!(failure.row_errors[0].row, 3);
    }

    #[test]
    fn test_missing_handler_is_rejected_before_reading() {
        let failure = Reader::<Order>::new(ReadOptions::default())
            .stream(&orders())
            .unwrap_err();
        assert!(matches!(
            failure.error,
            ReadError::Config(ConfigError::MissingHandler)
        ));

        let failure = Reader::<Order>::new(ReadOptions::default())
            .stream_file("/definitely/not/here.xlsx")
            .unwrap_err();
        assert!(matches!(
            failure.error,
            ReadError::Config(ConfigError::MissingHandler)
        ));
    }

    #[test]
    fn test_stream_bytes_with_free_function() {
        let text = b"ID,Customer\n7,Eve\n,Nobody\n";
        let mut ids = Vec::new();
        let errors = crate::reader::stream_bytes::<Order, _>(
            text,
            ReadOptions::default(),
            |_ctx: &RowContext, record: Option<Order>, _errors: &[RowError]| {
                if let Some(order) = record {
                    ids.push(order.id);
                }
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(ids, vec![7]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, FieldError::RequiredEmpty);
    }

    #[test]
    fn test_stream_file_writes_errors_back() {
        let mut file = NamedTempFile::with_suffix(".xlsx").unwrap();
        file.write_all(&orders().to_bytes().unwrap()).unwrap();

        let mut rows = 0;
        let errors = Reader::<Order>::new(ReadOptions::default().error_column(3))
            .on_row(|_ctx: &RowContext, _record: Option<Order>, _errors: &[RowError]| {
                rows += 1;
                Ok(())
            })
            .stream_file(file.path())
            .unwrap();
        assert_eq!(rows, 4);
        assert_eq!(errors.len(), 1);

        let annotated = document::open(file.path()).unwrap();
        assert_eq!(
            annotated.cell("Orders", CellRef::new(2, 3)).unwrap(),
            errors[0].message()
        );
        assert_eq!(annotated.cell("Orders", CellRef::new(2, 2)).unwrap(), "");
        assert_eq!(annotated.cell("Orders", CellRef::new(1, 4)).unwrap(), "Di");
    }

    #[test]
    fn test_stream_file_csv_without_error_column_leaves_file() {
        let text = "ID,Customer\nbad,Ann\n";
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let errors = crate::reader::stream_file::<Order, _>(
            file.path(),
            ReadOptions::default(),
            |_ctx: &RowContext, _record: Option<Order>, _errors: &[RowError]| Ok(()),
        )
        .unwrap();

        assert_eq!(errors.len(), 1);
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), text);
    }
}
