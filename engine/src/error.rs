//! Error types for the Sheetbind mapping engine.
//!
//! Errors are split by the stage that raises them:
//!
//! - [`ConvertError`] - cell text could not become a typed value
//! - [`FieldError`] - a row-level problem attached to a [`crate::RowError`]
//! - [`DocumentError`] - the tabular document collaborator failed
//! - [`ConfigError`] - options or mapping hints are unusable
//! - [`ReadError`] - a read or stream could not start, or was stopped
//! - [`StreamFailure`] - terminal stream error plus the row errors seen so far
//! - [`AnnotateError`] - writing error text back into a document failed
//!
//! Row-level problems never abort a read; they are collected as
//! [`crate::RowError`] values. Everything else is terminal.

use thiserror::Error;

use crate::models::RowError;

/// Boxed error returned by row handlers to stop a stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors while converting raw cell text into a typed value.
///
/// Every variant keeps the raw text so the message can be shown to the
/// person who typed it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConvertError {
    /// Text is not a base-10 integer.
    #[error("invalid integer: {0:?}")]
    InvalidInt(String),

    /// Integer parsed but does not fit the target type.
    #[error("integer {value:?} out of range for {target}")]
    IntOutOfRange { value: String, target: &'static str },

    /// Text is not a decimal number.
    #[error("invalid float: {0:?}")]
    InvalidFloat(String),

    /// Float is finite but does not fit the target type.
    #[error("float {value:?} out of range for {target}")]
    FloatOutOfRange { value: String, target: &'static str },

    /// Text is not one of the accepted boolean spellings.
    #[error("invalid bool: {0:?}")]
    InvalidBool(String),

    /// No date/time layout and no serial date matched.
    #[error("cannot parse time: {0:?}")]
    InvalidDateTime(String),

    /// Value kind is not supported by the target field.
    #[error("unsupported kind {kind} for value {value:?}")]
    Unsupported { kind: String, value: String },
}

// =============================================================================
// Row-level Field Errors
// =============================================================================

/// The underlying problem of a single [`RowError`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldError {
    /// Required field resolved to a blank cell.
    #[error("required value is empty")]
    RequiredEmpty,

    /// Required field resolved to a column past the end of the row.
    #[error("required column out of range")]
    RequiredOutOfRange,

    /// Cell text could not be converted.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The external validator rejected the populated record.
    #[error("column '{column}' failed on '{rule}': {message}")]
    Validation {
        column: String,
        rule: String,
        message: String,
    },

    /// The document could not deliver this row's cells.
    #[error("read row: {0}")]
    ReadRow(String),
}

// =============================================================================
// Document Errors
// =============================================================================

/// Errors from the tabular document collaborator.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Failed to read or write a file or stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding or encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX container could not be read.
    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    /// XLSX container could not be written.
    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Named sheet does not exist.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet index is past the last sheet.
    #[error("sheet index {index} out of range ({count} sheets)")]
    SheetIndexOutOfRange { index: usize, count: usize },

    /// Document contains no sheets at all.
    #[error("document has no sheets")]
    NoSheets,

    /// Cell address could not be parsed or is outside the sheet limits.
    #[error("invalid cell reference: {0:?}")]
    InvalidCellRef(String),

    /// File extension or content is not a known container.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// `save` was called on a document that was not opened from a path.
    #[error("document has no backing file to save to")]
    NoBackingFile,

    /// Operation needs a writable document.
    #[error("document is read-only: {0}")]
    ReadOnly(String),

    /// A field's date format hint cannot render its value.
    #[error("cannot format field {field} with {format:?}")]
    InvalidFormat { field: String, format: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid options, profiles or mapping hints.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Streaming read without a row handler.
    #[error("a row handler is required for streaming reads")]
    MissingHandler,

    /// Error write-back without a positive error column.
    #[error("error column must be > 0 to write errors")]
    MissingErrorColumn,

    /// Error column is past the last column a sheet can hold.
    #[error("error column {column} exceeds the sheet limit of {max} columns")]
    ErrorColumnOutOfRange { column: usize, max: usize },

    /// First data row does not come after the header row.
    #[error("first data row {first_data_row} must come after header row {header_row}")]
    InvalidLayout {
        header_row: usize,
        first_data_row: usize,
    },

    /// A field's rule expression could not be parsed.
    #[error("invalid rule '{rule}' on field '{field}': {message}")]
    InvalidRule {
        field: String,
        rule: String,
        message: String,
    },

    /// JSON schema could not be compiled.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Mapping profile is malformed.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
}

// =============================================================================
// Read / Stream Errors (top-level)
// =============================================================================

/// Terminal errors of a batch read or a stream.
///
/// Setup failures are raised before any row is read. `Handler` is raised
/// when a stream's row handler asks to stop.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Document error during setup.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Header row is past the last row of the sheet.
    #[error("header row {0} not found")]
    HeaderNotFound(usize),

    /// Row handler returned an error.
    #[error("row handler stopped at row {row}: {error}")]
    Handler { row: usize, error: BoxError },

    /// Automatic error write-back after a file stream failed.
    #[error("Annotation error: {0}")]
    Annotate(#[from] AnnotateError),
}

impl ReadError {
    /// The handler's own error, if this stream was stopped by its handler.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ReadError::Handler { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

/// Terminal stream error with the row errors accumulated before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct StreamFailure {
    /// What stopped the stream.
    #[source]
    pub error: ReadError,
    /// Row errors collected up to (and including) the stopping row.
    pub row_errors: Vec<RowError>,
}

impl StreamFailure {
    /// Failure raised before any row was processed.
    pub fn setup(error: impl Into<ReadError>) -> Self {
        Self {
            error: error.into(),
            row_errors: Vec::new(),
        }
    }
}

impl From<ReadError> for StreamFailure {
    fn from(error: ReadError) -> Self {
        Self::setup(error)
    }
}

// =============================================================================
// Annotation Errors
// =============================================================================

/// Errors while writing row errors back into a document.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cell read/write or persistence failed.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Copying the untouched source to the sink failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for value conversion.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Result type for annotation.
pub type AnnotateResult<T> = Result<T, AnnotateError>;
