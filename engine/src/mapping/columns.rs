//! Column letters, header lookup and the per-type column mapping.

use std::collections::HashMap;

use crate::schema::TypeDescriptor;

/// Spreadsheet letters for a 0-based column index (`0` -> `A`, `26` -> `AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// 0-based column index for spreadsheet letters, case-insensitive.
///
/// Returns `None` for empty input or anything that is not a letter.
pub fn column_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }

    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

// =============================================================================
// Header Index
// =============================================================================

/// Case-insensitive lookup from header text to column position.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
    names: Vec<String>,
}

impl HeaderIndex {
    /// Build from the cells of the header row.
    ///
    /// Keys are trimmed and lowercased. Blank cells are skipped and the
    /// leftmost of duplicate headers wins.
    pub fn from_cells(cells: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (idx, cell) in cells.iter().enumerate() {
            let key = cell.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            positions.entry(key).or_insert(idx);
        }

        Self {
            positions,
            names: cells.iter().map(|c| c.trim().to_string()).collect(),
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.trim().to_lowercase()).copied()
    }

    /// Original (trimmed) header text at a 0-based column.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// =============================================================================
// Column Mapping
// =============================================================================

/// Resolved 0-based column per field, in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<Option<usize>>,
}

impl ColumnMapping {
    /// Resolve every field of a descriptor against an optional header row.
    ///
    /// Precedence per field: explicit column number, then column letter,
    /// then the first alias found in the header. A letter that does not
    /// parse falls through to header matching. Fields that match nothing
    /// stay unmapped.
    pub fn resolve<R>(descriptor: &TypeDescriptor<R>, headers: Option<&HeaderIndex>) -> Self {
        let columns = descriptor
            .fields()
            .iter()
            .map(|field| {
                let resolved = field
                    .explicit_column()
                    .or_else(|| field.column_letter().and_then(column_index))
                    .or_else(|| {
                        let index = headers?;
                        field.header_aliases().iter().find_map(|alias| index.position(alias))
                    });

                match resolved {
                    Some(col) => tracing::debug!(
                        field = field.name(),
                        column = %column_letter(col),
                        "Resolved column"
                    ),
                    None => tracing::debug!(field = field.name(), "Field left unmapped"),
                }
                resolved
            })
            .collect();

        Self { columns }
    }

    /// Column of the field at `field_index` in descriptor order.
    pub fn column_of(&self, field_index: usize) -> Option<usize> {
        self.columns.get(field_index).copied().flatten()
    }

    pub fn columns(&self) -> &[Option<usize>] {
        &self.columns
    }

    /// Number of fields with a resolved column.
    pub fn mapped_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }

    /// Names of required fields that resolved to no column.
    pub fn unmapped_required<'d, R>(&self, descriptor: &'d TypeDescriptor<R>) -> Vec<&'d str> {
        descriptor
            .fields()
            .iter()
            .zip(&self.columns)
            .filter(|(field, column)| field.is_required() && column.is_none())
            .map(|(field, _)| field.name())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, TypeDescriptor};

    #[derive(Debug, Default)]
    struct Row {
        a: String,
        b: String,
        c: String,
        d: String,
    }

    fn headers(cells: &[&str]) -> HeaderIndex {
        let owned: Vec<String> = cells.iter().map(|s| s.to_string()).collect();
        HeaderIndex::from_cells(&owned)
    }

    #[test]
    fn test_column_letters_round_trip() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
        for idx in [0, 9, 27, 300, 16383] {
            assert_eq!(column_index(&column_letter(idx)), Some(idx));
        }
        assert_eq!(column_letter(usize::MAX).len(), 14);
    }

    #[test]
    fn test_column_index_rejects_non_letters() {
        assert_eq!(column_index("b"), Some(1));
        assert_eq!(column_index(" c "), Some(2));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("Ä"), None);
    }

    #[test]
    fn test_header_index_first_duplicate_wins() {
        let idx = headers(&[" Name ", "", "name", "Price"]);
        assert_eq!(idx.position("NAME"), Some(0));
        assert_eq!(idx.position("price"), Some(3));
        assert_eq!(idx.position(""), None);
        assert_eq!(idx.name_at(0), Some("Name"));
        assert_eq!(idx.name_at(1), None);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_resolution_precedence() {
        let descriptor = TypeDescriptor::new(
            "Row",
            vec![
                // number beats letter and header
                FieldDescriptor::<Row>::new("a", |r: &Row| &r.a, |r: &mut Row| &mut r.a)
                    .column(4)
                    .letter("B")
                    .header("alpha"),
                // letter beats header
                FieldDescriptor::<Row>::new("b", |r: &Row| &r.b, |r: &mut Row| &mut r.b)
                    .letter("c")
                    .header("alpha"),
                // invalid letter falls through to header, second alias matches
                FieldDescriptor::<Row>::new("c", |r: &Row| &r.c, |r: &mut Row| &mut r.c)
                    .letter("1")
                    .headers(["missing", "ALPHA"]),
                FieldDescriptor::<Row>::new("d", |r: &Row| &r.d, |r: &mut Row| &mut r.d)
                    .header("nowhere"),
            ],
        );
        let idx = headers(&["Alpha", "x", "y", "z"]);
        let mapping = ColumnMapping::resolve(&descriptor, Some(&idx));

        assert_eq!(mapping.column_of(0), Some(3));
        assert_eq!(mapping.column_of(1), Some(2));
        assert_eq!(mapping.column_of(2), Some(0));
        assert_eq!(mapping.column_of(3), None);
        assert_eq!(mapping.mapped_count(), 3);
    }

    #[test]
    fn test_resolution_without_headers() {
        let descriptor = TypeDescriptor::new(
            "Row",
            vec![
                FieldDescriptor::<Row>::new("a", |r: &Row| &r.a, |r: &mut Row| &mut r.a)
                    .header("alpha"),
                FieldDescriptor::<Row>::new("b", |r: &Row| &r.b, |r: &mut Row| &mut r.b)
                    .column(2),
            ],
        );
        let mapping = ColumnMapping::resolve(&descriptor, None);
        assert_eq!(mapping.columns(), &[None, Some(1)]);
        assert!(mapping.unmapped_required(&descriptor).is_empty());
    }

    #[test]
    fn test_unmapped_required_fields() {
        let descriptor = TypeDescriptor::new(
            "Row",
            vec![
                FieldDescriptor::<Row>::new("a", |r: &Row| &r.a, |r: &mut Row| &mut r.a)
                    .header("alpha")
                    .required(),
                FieldDescriptor::<Row>::new("b", |r: &Row| &r.b, |r: &mut Row| &mut r.b)
                    .header("beta")
                    .required(),
                FieldDescriptor::<Row>::new("c", |r: &Row| &r.c, |r: &mut Row| &mut r.c)
                    .header("gamma"),
            ],
        );
        let mapping = ColumnMapping::resolve(&descriptor, Some(&headers(&["beta", "delta"])));
        assert_eq!(mapping.unmapped_required(&descriptor), vec!["a"]);
    }
}
