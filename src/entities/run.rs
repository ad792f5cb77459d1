//! Run CSV rows and run payloads

use serde::Serialize;
use serde_json::Value;

use crate::core::loader::Record;
use crate::entities::row::{id_value, required, RowError};

pub const PART_COLUMN: &str = "part number";
pub const SERIAL_COLUMN: &str = "serial number";
pub const PROCEDURE_COLUMN: &str = "procedure (id)";
pub const TITLE_COLUMN: &str = "run title (leave blank for default format*)";

/// One row of the run CSV
#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub line: usize,
    pub part_number: String,
    pub serial_number: String,
    pub procedure_id: Value,
    pub title: Option<String>,
}

impl RunRow {
    pub const REQUIRED_COLUMNS: [&'static str; 3] = [PART_COLUMN, SERIAL_COLUMN, PROCEDURE_COLUMN];

    pub fn from_record(record: &Record<'_>) -> Result<Self, RowError> {
        Ok(Self {
            line: record.line,
            part_number: required(record, PART_COLUMN)?,
            serial_number: required(record, SERIAL_COLUMN)?,
            procedure_id: id_value(&required(record, PROCEDURE_COLUMN)?),
            title: record.string(TITLE_COLUMN),
        })
    }

    /// The run title, falling back to `<part> - <serial> - <procedure title>`
    pub fn title_or_default(&self, procedure_title: Option<&str>) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!(
                "{} - {} - {}",
                self.part_number,
                self.serial_number,
                procedure_title.unwrap_or_default()
            ),
        }
    }
}

/// `createRun` input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    pub title: String,
    pub procedure_id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_inventory_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::Table;
    use serde_json::json;
    use std::path::Path;

    const CSV: &str = "\
Part number,Serial number,Procedure (ID),Run title (leave blank for default format*)
P-1,SN-1,12,
P-1,SN-2,12,Custom title
";

    fn rows() -> Vec<RunRow> {
        let table = Table::from_csv_reader(Path::new("runs.csv"), CSV.as_bytes()).unwrap();
        assert!(table.require(&RunRow::REQUIRED_COLUMNS).is_ok());
        table
            .records()
            .map(|r| RunRow::from_record(&r).unwrap())
            .collect()
    }

    #[test]
    fn test_run_row_fields() {
        let rows = rows();
        assert_eq!(rows[0].procedure_id, json!(12));
        assert_eq!(rows[0].title, None);
        assert_eq!(rows[1].title.as_deref(), Some("Custom title"));
    }

    #[test]
    fn test_default_title() {
        let rows = rows();
        assert_eq!(rows[0].title_or_default(Some("Final test")), "P-1 - SN-1 - Final test");
        assert_eq!(rows[1].title_or_default(Some("Final test")), "Custom title");
    }

    #[test]
    fn test_run_input_shape() {
        let input = RunInput {
            title: "T".into(),
            procedure_id: json!(12),
            part_inventory_id: Some(json!(5)),
            part_id: None,
        };
        assert_eq!(
            serde_json::to_value(input).unwrap(),
            json!({"title": "T", "procedureId": 12, "partInventoryId": 5})
        );
    }
}
