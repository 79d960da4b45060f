//! Field and type descriptors.
//!
//! A [`TypeDescriptor`] is the per-record-type metadata the engine works
//! from: one [`FieldDescriptor`] per field, in declaration order, carrying
//! the mapping hints (header aliases, column number or letter, required
//! flag, date format, validation rules) and typed accessors.
//!
//! - [`Record`] - implemented by record types to describe themselves
//! - [`field!`](crate::field) - builds a descriptor for a struct field
//! - [`profile`] - JSON profiles describing [`profile::DynamicRecord`]s

pub mod profile;
pub mod value;

pub use profile::{DynamicRecord, FieldSpec, Profile};
pub use value::{CellValue, FieldKind, FieldType};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConvertResult;

/// Writes a converted value into a record.
pub type Setter<R> = Arc<dyn Fn(&mut R, CellValue) -> ConvertResult<()> + Send + Sync>;

/// Reads a field back out of a record.
pub type Getter<R> = Arc<dyn Fn(&R) -> CellValue + Send + Sync>;

// =============================================================================
// Field Descriptor
// =============================================================================

/// Metadata and accessors for one record field.
pub struct FieldDescriptor<R> {
    name: String,
    kind: FieldKind,
    optional: bool,
    headers: Vec<String>,
    column: Option<usize>,
    letter: Option<String>,
    required: bool,
    format: Option<String>,
    rules: Option<String>,
    setter: Setter<R>,
    getter: Getter<R>,
}

impl<R: 'static> FieldDescriptor<R> {
    /// Descriptor for a statically typed field.
    ///
    /// `get` and `set` project the record onto the field; the field's
    /// [`FieldType`] decides the kind and whether blanks become `None`.
    pub fn new<T, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        T: FieldType,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        S: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        Self::from_accessors(
            name,
            T::KIND,
            T::OPTIONAL,
            Arc::new(move |record: &R| get(record).to_cell()),
            Arc::new(move |record: &mut R, value: CellValue| {
                *set(record) = T::from_cell(value)?;
                Ok(())
            }),
        )
    }

    /// Descriptor built from raw accessors, for records without static fields.
    pub fn from_accessors(
        name: impl Into<String>,
        kind: FieldKind,
        optional: bool,
        getter: Getter<R>,
        setter: Setter<R>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            optional,
            headers: Vec::new(),
            column: None,
            letter: None,
            required: false,
            format: None,
            rules: None,
            setter,
            getter,
        }
    }
}

impl<R> FieldDescriptor<R> {
    /// Add a header alias.
    pub fn header(mut self, alias: impl Into<String>) -> Self {
        self.headers.push(alias.into());
        self
    }

    /// Add several header aliases, in priority order.
    pub fn headers<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Explicit 1-based column number; `0` clears it.
    pub fn column(mut self, number: usize) -> Self {
        self.column = number.checked_sub(1);
        self
    }

    /// Explicit column letter such as `"C"` or `"aa"`.
    pub fn letter(mut self, letter: impl Into<String>) -> Self {
        let letter = letter.into().trim().to_uppercase();
        self.letter = (!letter.is_empty()).then_some(letter);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Date/time layout hint (chrono `strftime` syntax).
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Validation rule expression, e.g. `"required,gt=0"`.
    pub fn rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn header_aliases(&self) -> &[String] {
        &self.headers
    }

    /// Explicit 0-based column, if configured.
    pub fn explicit_column(&self) -> Option<usize> {
        self.column
    }

    pub fn column_letter(&self) -> Option<&str> {
        self.letter.as_deref()
    }

    pub fn date_format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn rule_expr(&self) -> Option<&str> {
        self.rules.as_deref()
    }

    /// Name shown to users: the first header alias, else the field name.
    pub fn display_name(&self) -> &str {
        self.headers
            .first()
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Store a converted value into the record.
    pub fn set(&self, record: &mut R, value: CellValue) -> ConvertResult<()> {
        (self.setter)(record, value)
    }

    /// Read the field's current value.
    pub fn get(&self, record: &R) -> CellValue {
        (self.getter)(record)
    }
}

impl<R> Clone for FieldDescriptor<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            optional: self.optional,
            headers: self.headers.clone(),
            column: self.column,
            letter: self.letter.clone(),
            required: self.required,
            format: self.format.clone(),
            rules: self.rules.clone(),
            setter: Arc::clone(&self.setter),
            getter: Arc::clone(&self.getter),
        }
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("headers", &self.headers)
            .field("column", &self.column)
            .field("letter", &self.letter)
            .field("required", &self.required)
            .field("format", &self.format)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Type Descriptor
// =============================================================================

/// Ordered field descriptors of one record type, with lookup indexes.
pub struct TypeDescriptor<R> {
    type_name: String,
    fields: Vec<FieldDescriptor<R>>,
    by_name: HashMap<String, usize>,
    by_header: HashMap<String, usize>,
}

impl<R> TypeDescriptor<R> {
    pub fn new(type_name: impl Into<String>, fields: Vec<FieldDescriptor<R>>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_header = HashMap::new();
        for (idx, field) in fields.iter().enumerate() {
            by_name.entry(field.name.clone()).or_insert(idx);
            for alias in &field.headers {
                by_header.entry(alias.trim().to_lowercase()).or_insert(idx);
            }
        }

        Self {
            type_name: type_name.into(),
            fields,
            by_name,
            by_header,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor<R>> {
        self.fields.get(index)
    }

    /// Field position and descriptor by field name.
    pub fn find_by_name(&self, name: &str) -> Option<(usize, &FieldDescriptor<R>)> {
        let idx = *self.by_name.get(name)?;
        Some((idx, &self.fields[idx]))
    }

    /// Field position and descriptor by header alias, case-insensitive.
    pub fn find_by_header(&self, alias: &str) -> Option<(usize, &FieldDescriptor<R>)> {
        let idx = *self.by_header.get(&alias.trim().to_lowercase())?;
        Some((idx, &self.fields[idx]))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<R> fmt::Debug for TypeDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// A record type rows can be mapped into.
///
/// ```ignore
/// #[derive(Default)]
/// struct Product { sku: String, price: f64 }
///
/// impl Record for Product {
///     fn describe() -> TypeDescriptor<Self> {
///         TypeDescriptor::new("Product", vec![
///             field!(Product, sku).header("SKU").required(),
///             field!(Product, price).header("Price").rules("gt=0"),
///         ])
///     }
/// }
/// ```
pub trait Record: Default + 'static {
    fn describe() -> TypeDescriptor<Self>;
}

/// Build a [`FieldDescriptor`] for a named struct field.
#[macro_export]
macro_rules! field {
    ($ty:ty, $field:ident) => {
        $crate::schema::FieldDescriptor::<$ty>::new(
            stringify!($field),
            |record: &$ty| &record.$field,
            |record: &mut $ty| &mut record.$field,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use chrono::NaiveDate;

    #[derive(Debug, Default, PartialEq)]
    struct Product {
        sku: String,
        price: f64,
        launched: Option<NaiveDate>,
    }

    impl Record for Product {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::new(
                "Product",
                vec![
                    field!(Product, sku).headers(["SKU", "Code"]).required(),
                    field!(Product, price).column(3),
                    field!(Product, launched).letter("e").format("%d.%m.%Y"),
                ],
            )
        }
    }

    #[test]
    fn test_field_macro_captures_kind_and_hints() {
        let desc = Product::describe();
        assert_eq!(desc.type_name(), "Product");
        assert_eq!(desc.len(), 3);

        let sku = &desc.fields()[0];
        assert_eq!(sku.name(), "sku");
        assert_eq!(sku.kind(), FieldKind::Text);
        assert!(sku.is_required());
        assert_eq!(sku.display_name(), "SKU");

        let price = &desc.fields()[1];
        assert_eq!(price.kind(), FieldKind::Float);
        assert_eq!(price.explicit_column(), Some(2));
        assert_eq!(price.display_name(), "price");

        let launched = &desc.fields()[2];
        assert!(launched.is_optional());
        assert_eq!(launched.kind(), FieldKind::DateTime);
        assert_eq!(launched.column_letter(), Some("E"));
        assert_eq!(launched.date_format(), Some("%d.%m.%Y"));
    }

    #[test]
    fn test_accessors_write_and_read() {
        let desc = Product::describe();
        let mut record = Product::default();
        desc.fields()[0]
            .set(&mut record, CellValue::Text("A-1".into()))
            .unwrap();
        desc.fields()[1]
            .set(&mut record, CellValue::Float(9.5))
            .unwrap();
        desc.fields()[2].set(&mut record, CellValue::Absent).unwrap();

        assert_eq!(record.sku, "A-1");
        assert_eq!(desc.fields()[1].get(&record), CellValue::Float(9.5));
        assert_eq!(desc.fields()[2].get(&record), CellValue::Absent);
        assert!(desc.fields()[1]
            .set(&mut record, CellValue::Text("x".into()))
            .is_err());
    }

    #[test]
    fn test_lookup_by_name_and_header() {
        let desc = Product::describe();
        assert_eq!(desc.find_by_name("price").map(|(i, _)| i), Some(1));
        assert_eq!(desc.find_by_header(" code ").map(|(i, _)| i), Some(0));
        assert!(desc.find_by_name("missing").is_none());
    }

    #[test]
    fn test_column_zero_means_unset() {
        let desc = Product::describe();
        let field = desc.fields()[1].clone().column(0);
        assert_eq!(field.explicit_column(), None);
    }
}
