//! XLSX codec: read with calamine, write with rust_xlsxwriter.
//!
//! Only cell values survive a round trip. Numbers are written as numbers
//! when their text form reads back identically, everything else as text.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use std::io::Cursor;

use super::workbook::Sheet;
use crate::error::{DocumentError, DocumentResult};
use crate::models::CellRef;

/// Largest row count of an XLSX sheet.
pub const MAX_ROWS: usize = 1_048_576;

/// Largest column count of an XLSX sheet.
pub const MAX_COLS: usize = 16_384;

/// Read every sheet of an XLSX container.
///
/// Rows and columns before the used range are padded, so `rows[0]` is
/// always physical row 1 and `row[0]` column `A`.
pub fn read(bytes: &[u8]) -> DocumentResult<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let (first_row, first_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<String>> = vec![Vec::new(); first_row];
        for data_row in range.rows() {
            let mut cells = vec![String::new(); first_col];
            cells.extend(data_row.iter().map(cell_text));
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            rows.push(cells);
        }

        tracing::debug!(sheet = %name, rows = rows.len(), "Read XLSX sheet");
        sheets.push(Sheet::with_rows(name, rows));
    }

    Ok(sheets)
}

/// Text of one calamine cell.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => number_text(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        // serial day number; the value converter understands serials
        Data::DateTime(dt) => number_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

/// Integers without a trailing `.0`.
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Serialize sheets into an XLSX container.
pub fn write(sheets: &[Sheet]) -> DocumentResult<Vec<u8>> {
    let mut workbook = XlsxWorkbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet().set_name(&sheet.name)?;

        if sheet.row_count() > MAX_ROWS {
            return Err(DocumentError::InvalidCellRef(format!(
                "{}!{}",
                sheet.name,
                CellRef::new(0, sheet.row_count())
            )));
        }

        for (r, row) in sheet.rows().iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                if c >= MAX_COLS {
                    return Err(DocumentError::InvalidCellRef(format!(
                        "{}!{}",
                        sheet.name,
                        CellRef::new(c, r + 1)
                    )));
                }

                let (row_num, col_num) = (r as u32, c as u16);
                match numeric_value(text) {
                    Some(n) => worksheet.write_number(row_num, col_num, n)?,
                    None => worksheet.write_string(row_num, col_num, text)?,
                };
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// A number whose text form reads back unchanged.
fn numeric_value(text: &str) -> Option<f64> {
    let n = text.parse::<f64>().ok().filter(|n| n.is_finite())?;
    (number_text(n) == text).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_number_text() {
        assert_eq!(number_text(45000.0), "45000");
        assert_eq!(number_text(2.5), "2.5");
        assert_eq!(number_text(-3.0), "-3");
    }

    #[test]
    fn test_numeric_value_only_for_exact_text() {
        assert_eq!(numeric_value("42"), Some(42.0));
        assert_eq!(numeric_value("0.25"), Some(0.25));
        assert_eq!(numeric_value("007"), None);
        assert_eq!(numeric_value("1e3"), None);
        assert_eq!(numeric_value("abc"), None);
        assert_eq!(numeric_value("NaN"), None);
    }

    #[test]
    fn test_write_then_read_keeps_text() {
        let sheets = vec![
            Sheet::with_rows(
                "Products",
                vec![
                    strings(&["SKU", "Qty", "Note"]),
                    Vec::new(),
                    strings(&["A-1", "3", "line one\nline two"]),
                    strings(&["", "", "", "007"]),
                ],
            ),
            Sheet::with_rows("Empty", Vec::new()),
        ];

        let bytes = write(&sheets).unwrap();
        let back = read(&bytes).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0].name, "Products");
        assert_eq!(back[0].rows(), sheets[0].rows());
        assert_eq!(back[1].name, "Empty");
        assert_eq!(back[1].row_count(), 0);
    }

    #[test]
    fn test_read_rejects_garbage() {
        assert!(matches!(
            read(b"not a zip"),
            Err(DocumentError::XlsxRead(_))
        ));
    }
}
