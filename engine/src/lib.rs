//! # Sheetbind - spreadsheet rows to typed records, errors back into cells
//!
//! Sheetbind maps the rows of CSV and XLSX sheets onto Rust records,
//! collects every conversion and validation problem as an addressable
//! [`RowError`], and can write those errors back next to the offending rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / XLSX │────▶│   Column    │────▶│  Row Mapper │────▶│   Records   │
//! │  document   │     │  Resolver   │     │ (+validator)│     │  RowErrors  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!        ▲                                                           │
//!        └──────────────────── Error Annotator ◀─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetbind::{field, Reader, ReadOptions, Record, TypeDescriptor};
//!
//! #[derive(Debug, Default)]
//! struct Product {
//!     sku: String,
//!     qty: u32,
//! }
//!
//! impl Record for Product {
//!     fn describe() -> TypeDescriptor<Self> {
//!         TypeDescriptor::new("Product", vec![
//!             field!(Product, sku).header("SKU").required(),
//!             field!(Product, qty).header("Quantity").rules("gte=1"),
//!         ])
//!     }
//! }
//!
//! let result = Reader::<Product>::new(ReadOptions::default().error_column(10))
//!     .read_file("products.xlsx")?;
//! sheetbind::write_errors("products.xlsx", &result.errors, &ReadOptions::default().error_column(10))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Row errors, row context, read results, cell references
//! - [`schema`] - Field and type descriptors, JSON mapping profiles
//! - [`cache`] - Build-once descriptor registry
//! - [`mapping`] - Column resolution, value conversion, row mapping
//! - [`reader`] - Batch and streaming readers
//! - [`annotate`] - Error write-back
//! - [`export`] - Records back into a sheet
//! - [`document`] - CSV and XLSX documents
//! - [`validation`] - Validator trait, rule and JSON-schema validators
//! - [`logging`] - Subscriber setup for the binary

// Core modules
pub mod error;
pub mod models;

// Record metadata
pub mod cache;
pub mod schema;

// Mapping and reading
pub mod mapping;
pub mod reader;

// Write-back
pub mod annotate;
pub mod export;

// Documents
pub mod document;

// Validation
pub mod validation;

pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AnnotateError,
    BoxError,
    ConfigError,
    ConvertError,
    DocumentError,
    FieldError,
    ReadError,
    StreamFailure,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellRef, ReadResult, RowContext, RowError};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use cache::DescriptorRegistry;
pub use schema::{
    CellValue,
    DynamicRecord,
    FieldDescriptor,
    FieldKind,
    FieldSpec,
    FieldType,
    Profile,
    Record,
    TypeDescriptor,
};

// =============================================================================
// Re-exports - Reading
// =============================================================================

pub use reader::{
    read_bytes,
    read_file,
    stream_bytes,
    stream_file,
    ReadOptions,
    Reader,
    RowHandler,
    SheetSelector,
};

// =============================================================================
// Re-exports - Write-back
// =============================================================================

pub use annotate::{annotate, annotate_to, write_errors, write_errors_to};
pub use export::{export_records, export_with};

// =============================================================================
// Re-exports - Documents
// =============================================================================

pub use document::{Sheet, TabularDocument, Workbook};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{RuleValidator, SchemaValidator, ValidationFailure, Validator};
