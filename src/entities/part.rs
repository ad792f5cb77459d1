//! Part records and payloads

use serde::{Deserialize, Serialize};

use crate::core::loader::Record;
use crate::entities::row::{required, RowError};

/// How individual units of a part are tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingType {
    Serial,
    Lot,
}

impl std::fmt::Display for TrackingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingType::Serial => write!(f, "SERIAL"),
            TrackingType::Lot => write!(f, "LOT"),
        }
    }
}

impl std::str::FromStr for TrackingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" | "serialized" | "serial number" => Ok(TrackingType::Serial),
            "lot" | "lotted" | "lot number" => Ok(TrackingType::Lot),
            _ => Err(format!("Invalid tracking type: {}. Use serial or lot", s)),
        }
    }
}

/// `createPart` input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInput {
    pub part_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_part_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_type: Option<String>,
}

impl PartInput {
    pub fn new(part_number: impl Into<String>) -> Self {
        Self {
            part_number: part_number.into(),
            ..Default::default()
        }
    }
}

/// Only purely alphabetic revisions (`A`, `B`, `AC`) are sent; numeric
/// revision columns in CAD exports are file versions, not part revisions.
pub fn accepted_revision(revision: Option<&str>) -> Option<String> {
    revision
        .filter(|r| !r.is_empty() && r.chars().all(char::is_alphabetic))
        .map(str::to_string)
}

/// A row of the spreadsheet parts import
#[derive(Debug, Clone, PartialEq)]
pub struct PartRow {
    pub line: usize,
    pub part_number: String,
    pub description: Option<String>,
    pub tracking_level: Option<String>,
    pub revision: Option<String>,
}

impl PartRow {
    pub fn from_record(record: &Record<'_>) -> Result<Self, RowError> {
        Ok(Self {
            line: record.line,
            part_number: required(record, "part number")?,
            description: record.string("description"),
            tracking_level: record.string("tracking level"),
            revision: record.string("revision"),
        })
    }

    pub fn to_input(&self) -> PartInput {
        PartInput {
            part_number: self.part_number.clone(),
            description: self.description.clone(),
            supplier_part_number: None,
            revision: self.revision.clone(),
            tracking_type: self.tracking_level.as_ref().map(|t| t.to_uppercase()),
        }
    }

    /// `(partNumber, revision)` pair used to detect parts that already exist
    pub fn revision_key(&self) -> (String, String) {
        (
            self.part_number.clone(),
            self.revision.clone().unwrap_or_default(),
        )
    }
}
