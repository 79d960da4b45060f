//! Row Mapper - one row of cell text to a record or a list of row errors.

use super::columns::{column_letter, ColumnMapping, HeaderIndex};
use super::convert::convert_field;
use crate::error::FieldError;
use crate::models::RowError;
use crate::schema::{FieldDescriptor, TypeDescriptor};
use crate::validation::Validator;

/// Result of mapping one row.
///
/// `record` is `Some` exactly when `errors` is empty.
#[derive(Debug)]
pub struct RowOutcome<R> {
    pub record: Option<R>,
    pub errors: Vec<RowError>,
}

impl<R> RowOutcome<R> {
    pub fn is_ok(&self) -> bool {
        self.record.is_some()
    }
}

/// Maps rows of one sheet using a resolved column mapping.
pub struct RowMapper<'a, R> {
    descriptor: &'a TypeDescriptor<R>,
    mapping: &'a ColumnMapping,
    headers: Option<&'a HeaderIndex>,
    validator: Option<&'a dyn Validator<R>>,
}

impl<'a, R: Default> RowMapper<'a, R> {
    pub fn new(descriptor: &'a TypeDescriptor<R>, mapping: &'a ColumnMapping) -> Self {
        Self {
            descriptor,
            mapping,
            headers: None,
            validator: None,
        }
    }

    /// Header row used to name columns in row errors.
    pub fn with_headers(mut self, headers: Option<&'a HeaderIndex>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_validator(mut self, validator: Option<&'a dyn Validator<R>>) -> Self {
        self.validator = validator;
        self
    }

    /// Map one row of cell text.
    ///
    /// Blank cells leave the field at its default unless the field is
    /// required. Unmapped required fields and mapped columns past the end
    /// of the row count as out of range. The validator runs on the fully
    /// populated record, so its failures are reported alongside conversion
    /// errors of the same row.
    pub fn map_row(&self, cells: &[String], row: usize, logical: Option<usize>) -> RowOutcome<R> {
        let mut record = R::default();
        let mut errors = Vec::new();

        for (idx, field) in self.descriptor.fields().iter().enumerate() {
            let column = self.mapping.column_of(idx);
            let raw = match column.and_then(|c| cells.get(c)) {
                Some(raw) => raw,
                None => {
                    if field.is_required() {
                        errors.push(self.error(row, logical, Some(field), column, cells, FieldError::RequiredOutOfRange));
                    }
                    continue;
                }
            };

            if raw.trim().is_empty() {
                if field.is_required() {
                    errors.push(self.error(row, logical, Some(field), column, cells, FieldError::RequiredEmpty));
                }
                continue;
            }

            let converted = convert_field(raw, field).and_then(|value| field.set(&mut record, value));
            if let Err(e) = converted {
                errors.push(self.error(row, logical, Some(field), column, cells, e.into()));
            }
        }

        if let Some(validator) = self.validator {
            for failure in validator.validate(&record) {
                let found = self.descriptor.find_by_name(&failure.field);
                let column = found.and_then(|(idx, _)| self.mapping.column_of(idx));
                let field = found.map(|(_, f)| f);
                let display = field
                    .and_then(|f| f.header_aliases().first().cloned())
                    .unwrap_or_else(|| failure.field.clone());

                let mut err = self.error(
                    row,
                    logical,
                    field,
                    column,
                    cells,
                    FieldError::Validation {
                        column: display,
                        rule: failure.rule,
                        message: failure.message,
                    },
                );
                if field.is_none() {
                    err.field = Some(failure.field.clone());
                    err.column_name = Some(failure.field);
                }
                errors.push(err);
            }
        }

        if errors.is_empty() {
            RowOutcome {
                record: Some(record),
                errors,
            }
        } else {
            RowOutcome {
                record: None,
                errors,
            }
        }
    }

    fn error(
        &self,
        row: usize,
        logical: Option<usize>,
        field: Option<&FieldDescriptor<R>>,
        column: Option<usize>,
        cells: &[String],
        error: FieldError,
    ) -> RowError {
        let column_name = column
            .and_then(|c| self.headers.and_then(|h| h.name_at(c)))
            .map(str::to_string)
            .or_else(|| field.map(|f| f.display_name().to_string()));

        RowError {
            row,
            logical_row: logical,
            column: column.map(|c| c + 1),
            column_letter: column.map(column_letter),
            field: field.map(|f| f.name().to_string()),
            column_name,
            value: column
                .and_then(|c| cells.get(c))
                .cloned()
                .unwrap_or_default(),
            error,
        }
    }
}
