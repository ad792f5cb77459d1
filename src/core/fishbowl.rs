//! Fishbowl inventory export transform
//!
//! Fishbowl writes one CSV per export with its own column names, and lists
//! serial numbers as single-column rows under a `Serial Number` marker
//! following the part row they belong to. The transform maps the columns to
//! the inventory import vocabulary and turns every serial into a row of its
//! own, then writes all inputs into one combined CSV.

use chrono::{DateTime, Local};
use miette::Diagnostic;
use phf::phf_map;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Fishbowl column name to inventory column name
static COLUMN_MAPPING: phf::Map<&'static str, &'static str> = phf_map! {
    "PartNumber" => "part_number",
    "PartDescription" => "part_description",
    "Location" => "location_name",
    "Qty" => "quantity",
    "UOM" => "uom",
    "Cost" => "cost",
    "Date" => "created_date",
    "Tracking-Lot Number" => "lot_number",
    "PartType" => "tracking_type",
};

/// Columns of the combined output, in order
pub const OUTPUT_COLUMNS: [&str; 10] = [
    "part_number",
    "part_description",
    "location_name",
    "quantity",
    "uom",
    "cost",
    "created_date",
    "lot_number",
    "tracking_type",
    "serial_number",
];

const SERIAL_MARKER: &str = "Serial Number";

#[derive(Debug, Error, Diagnostic)]
pub enum TransformError {
    #[error("Cannot find files in input folder path: {path}")]
    #[diagnostic(code(ion::fishbowl::folder_not_found))]
    FolderNotFound { path: PathBuf },

    #[error("No .csv files found in {path}")]
    #[diagnostic(code(ion::fishbowl::no_input))]
    NoInputFiles { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(ion::fishbowl::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {path}: {source}")]
    #[diagnostic(code(ion::fishbowl::csv))]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One output row, aligned with [`OUTPUT_COLUMNS`]
pub type OutputRow = Vec<String>;

/// Result of a folder transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSummary {
    pub files: usize,
    pub rows: usize,
    pub serials: usize,
    pub output: PathBuf,
}

fn column_index(name: &str) -> usize {
    OUTPUT_COLUMNS
        .iter()
        .position(|c| *c == name)
        .unwrap_or(OUTPUT_COLUMNS.len() - 1)
}

/// Default output file name for a transform started at `now`
pub fn default_output_name(now: DateTime<Local>) -> String {
    format!(
        "ion_inventory_import_{}.csv",
        now.format("%Y-%m-%d_%H:%M:%S")
    )
}

/// The `.csv` files directly inside `folder`, sorted by name
pub fn csv_files(folder: &Path) -> Result<Vec<PathBuf>, TransformError> {
    if !folder.is_dir() {
        return Err(TransformError::FolderNotFound {
            path: folder.to_path_buf(),
        });
    }
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    Ok(files)
}

/// Where the serial expansion stands
enum SerialState {
    /// Plain rows
    Idle,
    /// After a marker: the part row the serials belong to, and whether any
    /// serial has been emitted for it yet
    Expanding { template: OutputRow, emitted: bool },
}

/// Transform one Fishbowl CSV into output rows.
///
/// Returns the rows and the number of serial rows produced. A marker row
/// followed by no serials leaves its part row unchanged.
pub fn transform_reader<R: Read>(path: &Path, reader: R) -> Result<(Vec<OutputRow>, usize), TransformError> {
    let csv_err = |source: csv::Error| TransformError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = reader.byte_records();
    let Some(header) = records.next().transpose().map_err(csv_err)? else {
        return Ok((Vec::new(), 0));
    };
    // (input column, output column) for every mapped header
    let columns: Vec<(usize, usize)> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let name = String::from_utf8_lossy(raw);
            COLUMN_MAPPING
                .get(name.trim())
                .map(|target| (idx, column_index(target)))
        })
        .collect();
    if columns.is_empty() {
        warn!(path = %path.display(), "no Fishbowl columns recognized");
    }

    let quantity = column_index("quantity");
    let serial = column_index("serial_number");
    let mut rows: Vec<OutputRow> = Vec::new();
    let mut serials = 0;
    let mut state = SerialState::Idle;

    for record in records {
        let record = record.map_err(csv_err)?;
        let cells: Vec<String> = record
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();

        if cells.len() == 1 {
            let value = cells[0].trim();
            if value == SERIAL_MARKER {
                // The part row is not written back: its serial rows carry one
                // unit each instead of a zero-quantity parent followed by
                // zero-quantity serials
                finish_serials(&mut state, &mut rows);
                if let Some(parent) = rows.pop() {
                    state = SerialState::Expanding {
                        template: parent,
                        emitted: false,
                    };
                }
                continue;
            }
            if let SerialState::Expanding { template, emitted } = &mut state {
                let mut row = template.clone();
                row[quantity] = "1".to_string();
                row[serial] = value.to_string();
                rows.push(row);
                *emitted = true;
                serials += 1;
            } else {
                debug!(
                    path = %path.display(),
                    line = ?record.position().map(|p| p.line()),
                    "single-column row outside a serial block"
                );
            }
            continue;
        }

        finish_serials(&mut state, &mut rows);
        let mut row = vec![String::new(); OUTPUT_COLUMNS.len()];
        for (from, to) in &columns {
            if let Some(value) = cells.get(*from) {
                row[*to] = value.clone();
            }
        }
        rows.push(row);
    }
    finish_serials(&mut state, &mut rows);

    Ok((rows, serials))
}

/// Close a serial block; a block without serials restores its part row
fn finish_serials(state: &mut SerialState, rows: &mut Vec<OutputRow>) {
    if let SerialState::Expanding { template, emitted } = std::mem::replace(state, SerialState::Idle) {
        if !emitted {
            rows.push(template);
        }
    }
}

/// Write rows as CSV with the output header
pub fn write_rows<W: Write>(writer: W, rows: &[OutputRow]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Transform every CSV in `folder` into one combined file at `output`
pub fn transform_folder(folder: &Path, output: &Path) -> Result<TransformSummary, TransformError> {
    let files = csv_files(folder)?;
    if files.is_empty() {
        return Err(TransformError::NoInputFiles {
            path: folder.to_path_buf(),
        });
    }

    let mut all_rows = Vec::new();
    let mut serials = 0;
    for file in &files {
        let handle = std::fs::File::open(file).map_err(|source| TransformError::Io {
            path: file.clone(),
            source,
        })?;
        let (rows, count) = transform_reader(file, handle)?;
        info!("Transformed {} into {} row(s)", file.display(), rows.len());
        all_rows.extend(rows);
        serials += count;
    }

    let out = std::fs::File::create(output).map_err(|source| TransformError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    write_rows(out, &all_rows).map_err(|source| TransformError::Csv {
        path: output.to_path_buf(),
        source,
    })?;

    Ok(TransformSummary {
        files: files.len(),
        rows: all_rows.len(),
        serials,
        output: output.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    const EXPORT: &str = "\
PartNumber,PartDescription,Location,Qty,UOM,Cost,Date,Tracking-Lot Number,PartType,Extra
A-1,Widget,Shelf 1,2,ea,1.50,2020-01-01,LOT1,Inventory,x
Serial Number
SN-1
SN-2
B-2,Bolt,Shelf 2,10,ea,0.10,2020-01-02,,Inventory,y
";

    fn transform(content: &str) -> (Vec<OutputRow>, usize) {
        transform_reader(Path::new("export.csv"), content.as_bytes()).unwrap()
    }

    fn col(row: &OutputRow, name: &str) -> String {
        row[column_index(name)].clone()
    }

    #[test]
    fn test_columns_are_mapped() {
        let (rows, _) = transform(EXPORT);
        let bolt = rows.last().unwrap();
        assert_eq!(col(bolt, "part_number"), "B-2");
        assert_eq!(col(bolt, "part_description"), "Bolt");
        assert_eq!(col(bolt, "location_name"), "Shelf 2");
        assert_eq!(col(bolt, "quantity"), "10");
        assert_eq!(col(bolt, "created_date"), "2020-01-02");
        assert_eq!(col(bolt, "tracking_type"), "Inventory");
        assert_eq!(col(bolt, "serial_number"), "");
    }

    #[test]
    fn test_serial_block_replaces_parent_row() {
        let (rows, serials) = transform(EXPORT);
        assert_eq!(serials, 2);
        assert_eq!(rows.len(), 3);
        for (row, sn) in rows.iter().zip(["SN-1", "SN-2"]) {
            assert_eq!(col(row, "part_number"), "A-1");
            assert_eq!(col(row, "lot_number"), "LOT1");
            assert_eq!(col(row, "quantity"), "1");
            assert_eq!(col(row, "serial_number"), sn);
        }
    }

    #[test]
    fn test_marker_without_serials_keeps_parent() {
        let content = "PartNumber,Qty\nA,5\nSerial Number\nB,3\n";
        let (rows, serials) = transform(content);
        assert_eq!(serials, 0);
        let parts: Vec<String> = rows.iter().map(|r| col(r, "part_number")).collect();
        assert_eq!(parts, vec!["A", "B"]);
        assert_eq!(col(&rows[0], "quantity"), "5");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut bytes = b"PartNumber,PartDescription\nA,Caf".to_vec();
        bytes.push(0xe9);
        bytes.push(b'\n');
        let (rows, _) = transform_reader(Path::new("x.csv"), bytes.as_slice()).unwrap();
        assert!(col(&rows[0], "part_description").starts_with("Caf"));
    }

    #[test]
    fn test_default_output_name() {
        let now = Local.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            default_output_name(now),
            "ion_inventory_import_2021-03-04_05:06:07.csv"
        );
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = tempdir().unwrap();
        let err = csv_files(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, TransformError::FolderNotFound { .. }));
    }

    #[test]
    fn test_transform_folder_combines_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("a.csv"), EXPORT).unwrap();
        std::fs::write(input.join("b.csv"), "PartNumber,Qty\nC-3,4\n").unwrap();
        std::fs::write(input.join("notes.txt"), "ignored").unwrap();
        let output = dir.path().join("out.csv");

        let summary = transform_folder(&input, &output).unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.serials, 2);

        let written = std::fs::read_to_string(&output).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next().unwrap(), OUTPUT_COLUMNS.join(","));
        assert_eq!(written.lines().count(), 5);
        assert!(written.contains("C-3,,,4"));
    }

    #[test]
    fn test_empty_folder_is_an_error() {
        let dir = tempdir().unwrap();
        let err = transform_folder(dir.path(), &dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(err, TransformError::NoInputFiles { .. }));
    }
}
