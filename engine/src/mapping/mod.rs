//! Row-to-record mapping.
//!
//! - [`columns`] - column letters, header index and the Column Resolver
//! - [`convert`] - the Value Converter
//! - [`row`] - the Row Mapper

pub mod columns;
pub mod convert;
pub mod row;

pub use columns::{column_index, column_letter, ColumnMapping, HeaderIndex};
pub use convert::{convert, convert_field, parse_bool, parse_datetime, serial_to_datetime};
pub use row::{RowMapper, RowOutcome};
