//! Record validation run after a row has been mapped.
//!
//! The row mapper only needs the [`Validator`] trait: given a populated
//! record, report zero or more [`ValidationFailure`]s naming the field, the
//! violated rule and a message. Two implementations ship with the crate:
//!
//! - [`RuleValidator`] - evaluates each field's rule expression (`"required,gt=0"`)
//! - [`SchemaValidator`] - checks `Serialize` records against a JSON Schema (draft 7)
//!
//! Any `Fn(&R) -> Vec<ValidationFailure>` is a validator too.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetbind::{Reader, ReadOptions, ValidationFailure};
//!
//! let check = |p: &Product| {
//!     if p.price > 1000.0 {
//!         vec![ValidationFailure::new("price", "max", "too expensive")]
//!     } else {
//!         vec![]
//!     }
//! };
//! let result = Reader::<Product>::new(ReadOptions::default())
//!     .validator(&check)
//!     .read_file("products.xlsx")?;
//! ```

pub mod rules;
pub mod schema;

pub use rules::RuleValidator;
pub use schema::SchemaValidator;

use serde::Serialize;

/// One rule a record broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Name of the offending field, as declared in the descriptor.
    pub field: String,
    /// Short rule tag, e.g. `gt` or `required`.
    pub rule: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Checks a populated record.
pub trait Validator<R: ?Sized> {
    fn validate(&self, record: &R) -> Vec<ValidationFailure>;
}

impl<R: ?Sized, F> Validator<R> for F
where
    F: Fn(&R) -> Vec<ValidationFailure>,
{
    fn validate(&self, record: &R) -> Vec<ValidationFailure> {
        self(record)
    }
}
