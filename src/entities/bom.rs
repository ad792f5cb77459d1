//! BOM rows from CAD exports and MBOM payloads

use serde::Serialize;
use serde_json::Value;

use crate::core::hierarchy::{DepthLine, LevelLine};
use crate::core::loader::{LoadError, Record, Table};
use crate::entities::part::{accepted_revision, PartInput};
use crate::entities::row::{number, required, RowError};

pub const LEVEL_COLUMN: &str = "level";
pub const DEPTH_COLUMN: &str = "depth";
pub const QUANTITY_COLUMNS: [&str; 2] = ["qty", "quantity"];

/// How rows encode their place in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomLayout {
    /// Dot-notation `Level` column
    Level,
    /// Integer `Depth` column
    Depth,
}

impl BomLayout {
    /// Pick the layout for a table. With no preference a `Level` column wins
    /// over a `Depth` column.
    pub fn detect(table: &Table, preferred: Option<BomLayout>) -> Result<Self, LoadError> {
        let layout = match preferred {
            Some(layout) => layout,
            None if table.has_column(LEVEL_COLUMN) => BomLayout::Level,
            None if table.has_column(DEPTH_COLUMN) => BomLayout::Depth,
            None => {
                table.require_any(&[LEVEL_COLUMN, DEPTH_COLUMN])?;
                BomLayout::Level
            }
        };
        table.require(&[layout.column(), "part number"])?;
        Ok(layout)
    }

    pub fn column(&self) -> &'static str {
        match self {
            BomLayout::Level => LEVEL_COLUMN,
            BomLayout::Depth => DEPTH_COLUMN,
        }
    }
}

/// Where a row sits in the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub enum BomPosition {
    Level(String),
    Depth(usize),
}

/// One BOM export row
#[derive(Debug, Clone, PartialEq)]
pub struct BomRow {
    pub line: usize,
    pub position: BomPosition,
    pub part_number: String,
    pub quantity: f64,
    pub description: Option<String>,
    pub vendor_no: Option<String>,
    pub revision: Option<String>,
}

impl BomRow {
    pub fn from_record(record: &Record<'_>, layout: BomLayout) -> Result<Self, RowError> {
        let raw = required(record, layout.column())?;
        let invalid = || RowError::InvalidLevel {
            line: record.line,
            column: layout.column().to_string(),
            value: raw.clone(),
        };
        let position = match layout {
            BomLayout::Level => {
                if raw.split('.').any(|segment| segment.trim().is_empty()) {
                    return Err(invalid());
                }
                BomPosition::Level(raw.clone())
            }
            BomLayout::Depth => BomPosition::Depth(raw.parse().map_err(|_| invalid())?),
        };

        Ok(Self {
            line: record.line,
            position,
            part_number: required(record, "part number")?,
            quantity: number(record, &QUANTITY_COLUMNS)?.unwrap_or(1.0),
            description: record.string("description"),
            vendor_no: record.string("vendorno"),
            revision: record.string("revision"),
        })
    }

    /// Row label for messages: the level key, or the line number
    pub fn label(&self) -> String {
        match &self.position {
            BomPosition::Level(level) => level.clone(),
            BomPosition::Depth(_) => self.line.to_string(),
        }
    }

    /// Input for creating the row's part when it does not exist yet
    pub fn part_input(&self) -> PartInput {
        PartInput {
            part_number: self.part_number.clone(),
            description: self.description.clone(),
            supplier_part_number: self.vendor_no.clone(),
            revision: accepted_revision(self.revision.as_deref()),
            tracking_type: None,
        }
    }
}

/// Dot-notation lines for the hierarchy resolver; depth rows are ignored
pub fn level_lines(rows: &[BomRow]) -> Vec<LevelLine> {
    rows.iter()
        .filter_map(|row| match &row.position {
            BomPosition::Level(level) => Some(LevelLine {
                level: level.clone(),
                part_number: row.part_number.clone(),
                quantity: row.quantity,
            }),
            BomPosition::Depth(_) => None,
        })
        .collect()
}

/// Depth lines for the hierarchy resolver; level rows are ignored
pub fn depth_lines(rows: &[BomRow]) -> Vec<DepthLine> {
    rows.iter()
        .filter_map(|row| match row.position {
            BomPosition::Depth(depth) => Some(DepthLine {
                label: row.label(),
                depth,
                part_number: row.part_number.clone(),
                quantity: row.quantity,
            }),
            BomPosition::Level(_) => None,
        })
        .collect()
}

/// `createMbomItem` input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MbomItemInput {
    pub part_id: Value,
    pub parent_id: Value,
    pub quantity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn table(content: &str) -> Table {
        Table::from_csv_reader(Path::new("TOP-ASSY.csv"), content.as_bytes()).unwrap()
    }

    fn rows(t: &Table, layout: BomLayout) -> Vec<Result<BomRow, RowError>> {
        t.records().map(|r| BomRow::from_record(&r, layout)).collect()
    }

    #[test]
    fn test_detect_prefers_level() {
        let t = table("Depth,Level,Part Number\n0,1,A\n");
        assert_eq!(BomLayout::detect(&t, None).unwrap(), BomLayout::Level);
        assert_eq!(
            BomLayout::detect(&t, Some(BomLayout::Depth)).unwrap(),
            BomLayout::Depth
        );
        let t = table("Depth,Part Number\n0,A\n");
        assert_eq!(BomLayout::detect(&t, None).unwrap(), BomLayout::Depth);
    }

    #[test]
    fn test_detect_without_hierarchy_column_fails() {
        let t = table("Part Number,Qty\nA,1\n");
        assert!(matches!(
            BomLayout::detect(&t, None),
            Err(LoadError::MissingColumn { .. })
        ));
        let t = table("Level,Qty\n1,1\n");
        assert!(BomLayout::detect(&t, None).is_err());
    }

    #[test]
    fn test_level_row_fields() {
        let t = table("Level,Part Number,Qty,Description,VendorNo,Revision\n1.2,B,3,Bolt,V-1,2\n");
        let row = rows(&t, BomLayout::Level).remove(0).unwrap();
        assert_eq!(row.position, BomPosition::Level("1.2".to_string()));
        assert_eq!(row.quantity, 3.0);
        assert_eq!(row.label(), "1.2");
        let input = serde_json::to_value(row.part_input()).unwrap();
        assert_eq!(
            input,
            json!({"partNumber": "B", "description": "Bolt", "supplierPartNumber": "V-1"})
        );
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let t = table("Level,Part Number\n1,A\n");
        assert_eq!(rows(&t, BomLayout::Level)[0].as_ref().unwrap().quantity, 1.0);
        let t = table("Level,Part Number,Quantity\n1,A,4\n");
        assert_eq!(rows(&t, BomLayout::Level)[0].as_ref().unwrap().quantity, 4.0);
    }

    #[test]
    fn test_invalid_positions_rejected() {
        let t = table("Level,Part Number\n1..2,A\n");
        assert!(matches!(
            rows(&t, BomLayout::Level)[0],
            Err(RowError::InvalidLevel { .. })
        ));
        let t = table("Depth,Part Number\n-1,A\n");
        assert!(matches!(
            rows(&t, BomLayout::Depth)[0],
            Err(RowError::InvalidLevel { .. })
        ));
    }

    #[test]
    fn test_depth_lines_use_line_labels() {
        let t = table("Depth,Part Number\n0,TOP\n1,A\n");
        let parsed: Vec<BomRow> = rows(&t, BomLayout::Depth)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        let lines = depth_lines(&parsed);
        assert_eq!(lines[1].label, "3");
        assert_eq!(lines[1].depth, 1);
        assert!(level_lines(&parsed).is_empty());
    }

    #[test]
    fn test_mbom_item_input_shape() {
        let input = MbomItemInput {
            part_id: json!(2),
            parent_id: json!(1),
            quantity: 2.0,
        };
        assert_eq!(
            serde_json::to_value(input).unwrap(),
            json!({"partId": 2, "parentId": 1, "quantity": 2.0})
        );
    }
}
