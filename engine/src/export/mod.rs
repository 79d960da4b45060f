//! Records back into a sheet.
//!
//! Uses the same descriptors as the readers, so an exported sheet reads
//! back into equal records:
//!
//! - fields with an explicit column number or letter keep that column
//! - the remaining fields fill the lowest free columns in declaration order
//! - the header cell is the field's first header alias, else its name
//! - date-times use the field's format hint, else the shortest layout the
//!   value converter accepts

use chrono::{NaiveDateTime, NaiveTime, SecondsFormat, Timelike};
use std::collections::BTreeSet;
use std::fmt::Write;

use crate::cache::DescriptorRegistry;
use crate::document::{Sheet, Workbook};
use crate::error::{DocumentError, DocumentResult};
use crate::mapping::column_index;
use crate::schema::{CellValue, FieldDescriptor, Record, TypeDescriptor};

/// Replace (or create) `sheet` with a header row plus one row per record.
pub fn export_records<R: Record>(workbook: &mut Workbook, sheet: &str, records: &[R]) -> DocumentResult<()> {
    let descriptor = DescriptorRegistry::global().descriptor::<R>();
    export_with(&descriptor, workbook, sheet, records)
}

/// Like [`export_records`] with an explicit descriptor.
pub fn export_with<R>(
    descriptor: &TypeDescriptor<R>,
    workbook: &mut Workbook,
    sheet: &str,
    records: &[R],
) -> DocumentResult<()> {
    let columns = layout(descriptor)?;
    let width = columns.iter().max().map_or(0, |c| c + 1);

    let mut rows = Vec::with_capacity(records.len() + 1);
    let mut header = vec![String::new(); width];
    for (field, &column) in descriptor.fields().iter().zip(&columns) {
        header[column] = field.display_name().to_string();
    }
    rows.push(header);

    for record in records {
        let mut row = vec![String::new(); width];
        for (field, &column) in descriptor.fields().iter().zip(&columns) {
            row[column] = cell_text(field, field.get(record))?;
        }
        rows.push(row);
    }

    *workbook.sheet_or_insert(sheet) = Sheet::with_rows(sheet, rows);
    tracing::info!(
        sheet = %sheet,
        record = descriptor.type_name(),
        records = records.len(),
        "Exported records"
    );
    Ok(())
}

/// 0-based output column of every field, in field order.
fn layout<R>(descriptor: &TypeDescriptor<R>) -> DocumentResult<Vec<usize>> {
    let explicit: Vec<Option<usize>> = descriptor
        .fields()
        .iter()
        .map(|f| f.explicit_column().or_else(|| f.column_letter().and_then(column_index)))
        .collect();

    let mut taken = BTreeSet::new();
    for (field, column) in descriptor.fields().iter().zip(&explicit) {
        if let Some(column) = column {
            if !taken.insert(*column) {
                return Err(DocumentError::InvalidCellRef(format!(
                    "field '{}' shares column {} with another field",
                    field.name(),
                    column + 1
                )));
            }
        }
    }

    let mut next = 0;
    let mut columns = Vec::with_capacity(explicit.len());
    for column in explicit {
        match column {
            Some(column) => columns.push(column),
            None => {
                while taken.contains(&next) {
                    next += 1;
                }
                taken.insert(next);
                columns.push(next);
            }
        }
    }
    Ok(columns)
}

fn cell_text<R>(field: &FieldDescriptor<R>, value: CellValue) -> DocumentResult<String> {
    match value {
        CellValue::DateTime(dt) => match field.date_format() {
            Some(format) => {
                // Stored date-times are UTC, so zoned specifiers render a zero offset.
                let mut text = String::new();
                write!(text, "{}", dt.and_utc().format(format)).map_err(|_| DocumentError::InvalidFormat {
                    field: field.name().to_string(),
                    format: format.to_string(),
                })?;
                Ok(text)
            }
            None => Ok(datetime_text(dt)),
        },
        other => Ok(other.to_string()),
    }
}

fn datetime_text(dt: NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else if dt.second() == 0 && dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M").to_string()
    } else {
        dt.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use crate::reader::{ReadOptions, Reader};
    use chrono::NaiveDate;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Shipment {
        code: String,
        weight: f64,
        fragile: bool,
        shipped: Option<NaiveDateTime>,
        due: NaiveDate,
        units: u16,
    }

    impl Record for Shipment {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::new(
                "Shipment",
                vec![
                    field!(Shipment, code).header("Code"),
                    field!(Shipment, weight).column(5).header("Weight"),
                    field!(Shipment, fragile).header("Fragile"),
                    field!(Shipment, shipped).header("Shipped"),
                    field!(Shipment, due).letter("B").format("%d/%m/%Y"),
                    field!(Shipment, units).header("Units"),
                ],
            )
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn samples() -> Vec<Shipment> {
        vec![
            Shipment {
                code: "S-1".into(),
                weight: 2.5,
                fragile: true,
                shipped: Some(date(2024, 3, 1).and_hms_opt(9, 30, 0).unwrap()),
                due: date(2024, 3, 5),
                units: 3,
            },
            Shipment {
                code: "S-2".into(),
                weight: 10.0,
                fragile: false,
                shipped: None,
                due: date(2024, 4, 1),
                units: 0,
            },
        ]
    }

    #[test]
    fn test_layout_places_explicit_columns_first() {
        let columns = layout(&Shipment::describe()).unwrap();
        // code, weight(E), fragile, shipped, due(B), units
        assert_eq!(columns, vec![0, 4, 2, 3, 1, 5]);
    }

    #[test]
    fn test_layout_rejects_shared_columns() {
        #[derive(Debug, Default)]
        struct Clash {
            a: String,
            b: String,
        }

        impl Record for Clash {
            fn describe() -> TypeDescriptor<Self> {
                TypeDescriptor::new(
                    "Clash",
                    vec![field!(Clash, a).column(2), field!(Clash, b).letter("B")],
                )
            }
        }

        assert!(layout(&Clash::describe()).is_err());
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let mut wb = Workbook::new();
        export_records(&mut wb, "Out", &samples()).unwrap();

        let rows = wb.sheet("Out").unwrap().rows();
        assert_eq!(rows[0], vec!["Code", "due", "Fragile", "Shipped", "Weight", "Units"]);
        assert_eq!(rows[1], vec!["S-1", "05/03/2024", "true", "2024-03-01 09:30", "2.5", "3"]);
        assert_eq!(rows[2], vec!["S-2", "01/04/2024", "false", "", "10", "0"]);
    }

    #[test]
    fn test_datetime_text_uses_shortest_layout() {
        let day = date(2023, 3, 15);
        assert_eq!(datetime_text(day.and_hms_opt(0, 0, 0).unwrap()), "2023-03-15");
        assert_eq!(datetime_text(day.and_hms_opt(14, 5, 0).unwrap()), "2023-03-15 14:05");
        assert_eq!(
            datetime_text(day.and_hms_opt(14, 5, 9).unwrap()),
            "2023-03-15T14:05:09Z"
        );
    }

    #[test]
    fn test_export_then_read_gives_equal_records() {
        let mut wb = Workbook::new();
        export_records(&mut wb, "Shipments", &samples()).unwrap();
        let bytes = wb.to_bytes().unwrap();

        let result = Reader::<Shipment>::new(ReadOptions::default().sheet("Shipments"))
            .read_bytes(&bytes)
            .unwrap();
        assert!(result.is_clean(), "{:?}", result.errors);
        assert_eq!(result.records, samples());
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Departure {
        flight: String,
        at: NaiveDateTime,
    }

    impl Record for Departure {
        fn describe() -> TypeDescriptor<Self> {
            TypeDescriptor::new(
                "Departure",
                vec![
                    field!(Departure, flight).header("Flight"),
                    field!(Departure, at).header("At").format("%Y-%m-%dT%H:%M:%S%z"),
                ],
            )
        }
    }

    #[test]
    fn test_export_zoned_format_hint() {
        let csv = b"Flight,At\nLH-1,2024-01-15T10:00:00+0200\n";
        let read = Reader::<Departure>::new(ReadOptions::default())
            .read_bytes(csv)
            .unwrap();
        assert!(read.errors.is_empty(), "{:?}", read.errors);
        assert_eq!(read.records[0].at, date(2024, 1, 15).and_hms_opt(8, 0, 0).unwrap());

        let mut workbook = Workbook::new();
        export_records(&mut workbook, "Out", &read.records).unwrap();
        let sheet = workbook.sheet("Out").unwrap();
        assert_eq!(sheet.rows()[1], vec!["LH-1", "2024-01-15T08:00:00+0000"]);

        let bytes = workbook.to_bytes().unwrap();
        let again = Reader::<Departure>::new(ReadOptions::default().sheet("Out"))
            .read_bytes(&bytes)
            .unwrap();
        assert_eq!(again.records, read.records);
    }

    #[test]
    fn test_export_unrenderable_format_is_an_error() {
        let descriptor = TypeDescriptor::new(
            "Departure",
            vec![field!(Departure, at).header("At").format("%Y %Q")],
        );
        let records = vec![Departure::default()];
        let mut workbook = Workbook::new();
        let err = export_with(&descriptor, &mut workbook, "Out", &records).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidFormat { ref field, .. } if field == "at"));
        assert!(workbook.sheet("Out").is_none());
    }
}
