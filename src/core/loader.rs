//! Tabular input loading
//!
//! Reads CSV files and spreadsheets into a [`Table`]: the first row is the
//! header, every later non-blank row is a record. Header lookup ignores case
//! and surrounding whitespace, so `Part Number`, `part number ` and
//! `PART NUMBER` all address the same column.

use calamine::{open_workbook_auto, Data, Reader};
use miette::Diagnostic;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading an input file
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Input file not found: {path}")]
    #[diagnostic(code(ion::load::not_found), help("Check the path and try again"))]
    NotFound { path: PathBuf },

    #[error("Unsupported input format '{extension}' for {path}")]
    #[diagnostic(
        code(ion::load::unsupported),
        help("Use a .csv file or a .xlsx, .xlsm, .xls or .ods spreadsheet")
    )]
    Unsupported { path: PathBuf, extension: String },

    #[error("Failed to read CSV {path}: {source}")]
    #[diagnostic(code(ion::load::csv))]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read spreadsheet {path}: {message}")]
    #[diagnostic(code(ion::load::spreadsheet))]
    Spreadsheet { path: PathBuf, message: String },

    #[error("{path} has no header row")]
    #[diagnostic(code(ion::load::empty))]
    Empty { path: PathBuf },

    #[error("{path} is missing required column '{column}'")]
    #[diagnostic(code(ion::load::missing_column))]
    MissingColumn { path: PathBuf, column: String },
}

/// Normalize a header for lookup
pub fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Build a map from normalized header name to column index.
///
/// When a header repeats, the first column wins.
pub fn build_header_map<'a, I>(headers: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = HashMap::new();
    for (idx, header) in headers.into_iter().enumerate() {
        map.entry(normalize_header(header)).or_insert(idx);
    }
    map
}

/// A loaded table
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    headers: Vec<String>,
    header_map: HashMap<String, usize>,
    rows: Vec<(usize, Vec<String>)>,
}

/// One record of a [`Table`]
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Line of the record in the input, the header being line 1
    pub line: usize,
    header_map: &'a HashMap<String, usize>,
    cells: &'a [String],
}

impl<'a> Record<'a> {
    /// Trimmed value of a column; empty cells and unknown columns are `None`
    pub fn get(&self, field: &str) -> Option<&'a str> {
        self.header_map
            .get(field)
            .and_then(|&idx| self.cells.get(idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Owned copy of [`Record::get`]
    pub fn string(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }
}

impl Table {
    /// Build a table from already-split cells.
    ///
    /// Blank rows are dropped; line numbers count them anyway.
    pub fn from_rows(path: impl Into<PathBuf>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let header_map = build_header_map(headers.iter().map(String::as_str));
        let rows = rows
            .into_iter()
            .enumerate()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|(idx, cells)| (idx + 2, cells))
            .collect();
        Self {
            path: path.into(),
            headers,
            header_map,
            rows,
        }
    }

    /// Load a CSV or spreadsheet, picking the reader from the extension
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let table = match extension.as_str() {
            "csv" | "txt" => {
                let file = std::fs::File::open(path).map_err(|e| LoadError::Csv {
                    path: path.to_path_buf(),
                    source: e.into(),
                })?;
                Self::from_csv_reader(path, file)?
            }
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::from_spreadsheet(path)?,
            _ => {
                return Err(LoadError::Unsupported {
                    path: path.to_path_buf(),
                    extension,
                })
            }
        };
        debug!(
            path = %path.display(),
            columns = table.headers.len(),
            rows = table.rows.len(),
            "loaded input table"
        );
        Ok(table)
    }

    /// Read CSV from any reader. Invalid UTF-8 is replaced, not rejected.
    pub fn from_csv_reader<R: Read>(path: &Path, reader: R) -> Result<Self, LoadError> {
        let csv_err = |source: csv::Error| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::Empty {
                path: path.to_path_buf(),
            });
        }

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(csv_err)?;
            rows.push(
                record
                    .iter()
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect(),
            );
        }
        Ok(Self::from_rows(path, headers, rows))
    }

    /// Read the first worksheet of a spreadsheet
    pub fn from_spreadsheet(path: &Path) -> Result<Self, LoadError> {
        let sheet_err = |message: String| LoadError::Spreadsheet {
            path: path.to_path_buf(),
            message,
        };
        let mut workbook = open_workbook_auto(path).map_err(|e| sheet_err(e.to_string()))?;
        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| sheet_err("workbook has no sheets".to_string()))?;
        let range = workbook
            .worksheet_range(&first)
            .map_err(|e| sheet_err(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| LoadError::Empty {
                path: path.to_path_buf(),
            })?
            .iter()
            .map(cell_text)
            .collect();
        let rows = rows.map(|row| row.iter().map(cell_text).collect()).collect();
        Ok(Self::from_rows(path, headers, rows))
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.header_map.contains_key(field)
    }

    /// Fail unless every named column is present
    pub fn require(&self, fields: &[&str]) -> Result<(), LoadError> {
        match fields.iter().find(|f| !self.has_column(f)) {
            Some(missing) => Err(LoadError::MissingColumn {
                path: self.path.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Fail unless at least one of the alternative columns is present
    pub fn require_any(&self, fields: &[&str]) -> Result<(), LoadError> {
        if fields.iter().any(|f| self.has_column(f)) {
            Ok(())
        } else {
            Err(LoadError::MissingColumn {
                path: self.path.clone(),
                column: fields.join(" or "),
            })
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|(line, cells)| Record {
            line: *line,
            header_map: &self.header_map,
            cells,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a spreadsheet cell the way it reads in the sheet.
///
/// Whole-number floats lose their fraction so part numbers and quantities
/// typed as numbers come out as `1234`, not `1234.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    fn csv_table(content: &str) -> Table {
        Table::from_csv_reader(Path::new("test.csv"), content.as_bytes()).unwrap()
    }

    #[test]
    fn test_header_matching_ignores_case_and_whitespace() {
        let table = csv_table(" Part Number ,QTY\nA-1,2\n");
        let record = table.records().next().unwrap();
        assert_eq!(record.get("part number"), Some("A-1"));
        assert_eq!(record.get("qty"), Some("2"));
        assert!(table.has_column("part number"));
    }

    #[test]
    fn test_blank_rows_skipped_and_lines_counted() {
        let table = csv_table("a,b\n1,2\n,\n3,4\n");
        let lines: Vec<usize> = table.records().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_short_rows_and_empty_cells_are_none() {
        let table = csv_table("a,b,c\n1\n2, ,x\n");
        let rows: Vec<Record> = table.records().collect();
        assert_eq!(rows[0].get("b"), None);
        assert_eq!(rows[1].get("b"), None);
        assert_eq!(rows[1].get("c"), Some("x"));
        assert_eq!(rows[1].get("missing"), None);
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let table = csv_table("\u{feff}Level,Part Number\n1,A\n");
        assert!(table.has_column("level"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut bytes = b"name\nBin ".to_vec();
        bytes.push(0xff);
        bytes.push(b'\n');
        let table = Table::from_csv_reader(Path::new("x.csv"), bytes.as_slice()).unwrap();
        let name = table.records().next().unwrap().string("name").unwrap();
        assert!(name.starts_with("Bin"));
    }

    #[test]
    fn test_require_reports_missing_column() {
        let table = csv_table("a,b\n1,2\n");
        assert!(table.require(&["a", "b"]).is_ok());
        let err = table.require(&["a", "c"]).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column, .. } if column == "c"));
        assert!(table.require_any(&["x", "b"]).is_ok());
        assert!(table.require_any(&["x", "y"]).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Table::load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{}}").unwrap();
        let err = Table::load(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Unsupported { extension, .. } if extension == "json"));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Part Number,Qty").unwrap();
        writeln!(file, "A,1").unwrap();
        writeln!(file, "B,2").unwrap();
        let table = Table::load(file.path()).unwrap();
        assert!(table.has_column("part number"));
        assert!(table.has_column("qty"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_cell_text_drops_whole_fraction() {
        assert_eq!(cell_text(&Data::Float(1234.0)), "1234");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("x".into())), "x");
    }
}
