//! CSV codec with encoding and delimiter auto-detection.
//!
//! CSV files become single-sheet documents named [`CSV_SHEET`]. Blank lines
//! are kept as empty rows so physical row numbers match what a spreadsheet
//! application shows.

use ::csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::{RowIter, TabularDocument};
use crate::error::{DocumentError, DocumentResult};
use crate::models::CellRef;

/// Name of the only sheet of a CSV document.
pub const CSV_SHEET: &str = "Sheet1";

/// Bytes inspected when sniffing a streamed file.
const SNIFF_LEN: usize = 64 * 1024;

/// Dialect of a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: UTF_8,
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => UTF_8,
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252,
        other => Encoding::for_label(other.as_bytes()).unwrap_or(UTF_8),
    }
}

/// Detect the delimiter by counting candidates on the first non-blank line.
///
/// Falls back to a comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let mut best = b',';
    let mut best_count = 0;
    for sep in [b',', b';', b'\t', b'|'] {
        let count = first_line.bytes().filter(|b| *b == sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

/// Decode bytes, removing a byte-order mark if present.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    encoding.decode_with_bom_removal(bytes).0.into_owned()
}

// =============================================================================
// Whole-file codec
// =============================================================================

/// Parse a CSV file into rows, detecting its dialect.
pub fn parse(bytes: &[u8]) -> DocumentResult<(Vec<Vec<String>>, CsvFormat)> {
    let encoding = detect_encoding(bytes);
    let text = decode(bytes, encoding);
    let delimiter = detect_delimiter(&text);

    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let rows = CsvRows::new(reader, UTF_8).collect::<DocumentResult<Vec<_>>>()?;
    Ok((rows, CsvFormat { delimiter, encoding }))
}

/// Serialize rows in the given dialect.
pub fn write(rows: &[Vec<String>], format: CsvFormat) -> DocumentResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .delimiter(format.delimiter)
        .from_writer(Vec::new());

    for row in rows {
        if row.is_empty() {
            // an empty record would vanish on re-read
            writer.write_record([""])?;
        } else {
            writer.write_record(row)?;
        }
    }

    let utf8 = writer
        .into_inner()
        .map_err(|e| DocumentError::Io(e.into_error()))?;
    if format.encoding == UTF_8 {
        return Ok(utf8);
    }
    let text = String::from_utf8_lossy(&utf8);
    Ok(format.encoding.encode(&text).0.into_owned())
}

// =============================================================================
// Row iterator
// =============================================================================

/// Yields one item per physical line-row, re-inserting skipped blank lines.
struct CsvRows<R> {
    records: ::csv::ByteRecordsIntoIter<R>,
    encoding: &'static Encoding,
    next_line: u64,
    blanks: u64,
    pending: Option<Vec<String>>,
}

impl<R: Read> CsvRows<R> {
    fn new(reader: ::csv::Reader<R>, encoding: &'static Encoding) -> Self {
        Self {
            records: reader.into_byte_records(),
            encoding,
            next_line: 1,
            blanks: 0,
            pending: None,
        }
    }

    fn decode_record(&self, record: &ByteRecord) -> Vec<String> {
        record
            .iter()
            .map(|field| self.encoding.decode_without_bom_handling(field).0.into_owned())
            .collect()
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = DocumentResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.blanks > 0 {
            self.blanks -= 1;
            return Some(Ok(Vec::new()));
        }
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }

        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };

        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(self.next_line);
        let embedded = record
            .iter()
            .map(|f| f.iter().filter(|b| **b == b'\n').count() as u64)
            .sum::<u64>();
        let skipped = line.saturating_sub(self.next_line);
        self.next_line = line + embedded + 1;

        let row = self.decode_record(&record);
        if skipped == 0 {
            Some(Ok(row))
        } else {
            self.blanks = skipped - 1;
            self.pending = Some(row);
            Some(Ok(Vec::new()))
        }
    }
}

// =============================================================================
// Streaming source
// =============================================================================

/// Read-only CSV document that re-reads the file for every row pass.
///
/// Memory use is bounded by the longest row rather than the file size.
/// Files in encodings that are not ASCII-compatible are buffered whole.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    path: PathBuf,
    format: CsvFormat,
}

impl CsvRowSource {
    /// Open a file and detect its dialect from the first bytes.
    pub fn open(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut sample = Vec::with_capacity(SNIFF_LEN);
        File::open(&path)?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut sample)?;

        let encoding = detect_encoding(&sample);
        let delimiter = detect_delimiter(&decode(&sample, encoding));
        Ok(Self {
            path,
            format: CsvFormat { delimiter, encoding },
        })
    }

    pub fn format(&self) -> CsvFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_sheet(&self, sheet: &str) -> DocumentResult<()> {
        if sheet == CSV_SHEET {
            Ok(())
        } else {
            Err(DocumentError::SheetNotFound(sheet.to_string()))
        }
    }

    fn reader<R: Read>(&self, source: R) -> ::csv::Reader<R> {
        ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.format.delimiter)
            .from_reader(source)
    }
}

impl TabularDocument for CsvRowSource {
    fn sheet_names(&self) -> Vec<String> {
        vec![CSV_SHEET.to_string()]
    }

    fn rows(&self, sheet: &str) -> DocumentResult<RowIter<'_>> {
        self.check_sheet(sheet)?;

        if self.format.encoding.is_ascii_compatible() {
            let file = File::open(&self.path)?;
            let mut rows = CsvRows::new(self.reader(file), self.format.encoding);
            // strip a UTF-8 byte-order mark from the very first cell
            let first = rows.next().map(|row| {
                row.map(|mut cells| {
                    if let Some(cell) = cells.first_mut() {
                        if let Some(stripped) = cell.strip_prefix('\u{feff}') {
                            *cell = stripped.to_string();
                        }
                    }
                    cells
                })
            });
            Ok(Box::new(first.into_iter().chain(rows)))
        } else {
            let text = decode(&std::fs::read(&self.path)?, self.format.encoding);
            let rows: Vec<_> = CsvRows::new(self.reader(std::io::Cursor::new(text.into_bytes())), UTF_8).collect();
            Ok(Box::new(rows.into_iter()))
        }
    }

    fn cell(&self, sheet: &str, cell: CellRef) -> DocumentResult<String> {
        let index = cell
            .row
            .checked_sub(1)
            .ok_or_else(|| DocumentError::InvalidCellRef(cell.to_string()))?;
        match self.rows(sheet)?.nth(index) {
            Some(row) => Ok(row?.get(cell.column).cloned().unwrap_or_default()),
            None => Ok(String::new()),
        }
    }

    fn set_cell(&mut self, _sheet: &str, _cell: CellRef, _value: &str) -> DocumentResult<()> {
        Err(DocumentError::ReadOnly(self.path.display().to_string()))
    }

    fn save(&mut self) -> DocumentResult<()> {
        Err(DocumentError::ReadOnly(self.path.display().to_string()))
    }

    fn write_to(&self, sink: &mut dyn Write) -> DocumentResult<()> {
        std::io::copy(&mut File::open(&self.path)?, sink)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("\n\na\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_detect_encoding_latin1() {
        let bytes = encoding_rs::WINDOWS_1252
            .encode(concat!(
                "nom;pr\u{e9}nom;soci\u{e9}t\u{e9};r\u{e9}gion\n",
                "Jos\u{e9};Fran\u{e7}ois;Caf\u{e9} des \u{c9}l\u{e8}ves;Pr\u{e9}fecture\n",
                "H\u{e9}l\u{e8}ne;Andr\u{e9};Cr\u{e9}dit g\u{e9}n\u{e9}ral;C\u{f4}te d'Azur\n",
            ))
            .0
            .into_owned();
        let (rows, format) = parse(&bytes).unwrap();
        assert_ne!(format.encoding, UTF_8);
        assert_eq!(rows[1][0], "Jos\u{e9}");
    }

    #[test]
    fn test_parse_keeps_blank_lines_as_rows() {
        let (rows, format) = parse(b"h1,h2\n\n\na,b\n\"multi\nline\",c\nx,y\n").unwrap();
        assert_eq!(format.delimiter, b',');
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], vec!["h1", "h2"]);
        assert!(rows[1].is_empty());
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], vec!["a", "b"]);
        assert_eq!(rows[4][0], "multi\nline");
        assert_eq!(rows[5], vec!["x", "y"]);

        let (rows, _) = parse(b"h1,h2\n\"multi\nline\",c\n\nx,y\n").unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], vec!["x", "y"]);
    }

    #[test]
    fn test_write_preserves_rows_and_quotes_newlines() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec![],
            vec!["c".to_string(), "line1\nline2".to_string()],
        ];
        let bytes = write(&rows, CsvFormat::default()).unwrap();
        let (back, _) = parse(&bytes).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[0], rows[0]);
        assert!(back[1].iter().all(|c| c.is_empty()));
        assert_eq!(back[2], rows[2]);
    }

    #[test]
    fn test_row_source_streams_rows() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(b"\xef\xbb\xbfname;qty\n\nbolt;3\n").unwrap();

        let source = CsvRowSource::open(file.path()).unwrap();
        assert_eq!(source.format().delimiter, b';');

        let rows: Vec<Vec<String>> = source
            .rows(CSV_SHEET)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "name");
        assert_eq!(rows[2], vec!["bolt", "3"]);
        assert_eq!(source.cell(CSV_SHEET, "B3".parse().unwrap()).unwrap(), "3");
        assert!(source.rows("Other").is_err());

        let mut copy = Vec::new();
        source.write_to(&mut copy).unwrap();
        assert!(copy.ends_with(b"bolt;3\n"));
    }
}
