//! Inventory rows, the upload plan built from them, and inventory payloads
//!
//! An inventory CSV lists stock per row. Before anything is sent the rows are
//! grouped into an [`UploadPlan`]: each unit of measure, location, part, lot
//! and serial appears once, and rows for the same part sitting in the same
//! place with the same lot and serial collapse into one inventory record.

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::core::kind::inventory_key;
use crate::core::loader::Record;
use crate::entities::part::{PartInput, TrackingType};
use crate::entities::row::{number, required, RowError};

/// One row of the inventory CSV
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryRow {
    pub line: usize,
    pub part_number: String,
    pub part_description: Option<String>,
    pub location_name: Option<String>,
    pub quantity: Option<f64>,
    pub uom: Option<String>,
    pub cost: Option<f64>,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub tracking_type: Option<String>,
    pub created_date: Option<String>,
}

impl InventoryRow {
    pub const REQUIRED_COLUMNS: [&'static str; 2] = ["part_number", "quantity"];

    pub fn from_record(record: &Record<'_>) -> Result<Self, RowError> {
        Ok(Self {
            line: record.line,
            part_number: required(record, "part_number")?,
            part_description: record.string("part_description"),
            location_name: record.string("location_name"),
            quantity: number(record, &["quantity"])?,
            uom: record.string("uom"),
            cost: number(record, &["cost"])?,
            lot_number: record.string("lot_number"),
            serial_number: record.string("serial_number"),
            tracking_type: record.string("tracking_type"),
            created_date: record.string("created_date"),
        })
    }
}

/// A part to create
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPart {
    pub part_number: String,
    pub description: Option<String>,
    pub tracking_type: Option<TrackingType>,
}

impl PlannedPart {
    pub fn to_input(&self) -> PartInput {
        PartInput {
            part_number: self.part_number.clone(),
            description: self.description.clone(),
            supplier_part_number: None,
            revision: None,
            tracking_type: self.tracking_type.map(|t| t.to_string()),
        }
    }
}

/// An inventory record to create, still referencing its part, location and
/// unit of measure by natural key
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedInventory {
    pub part_number: String,
    pub location_name: Option<String>,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: f64,
    pub uom: Option<String>,
    pub cost: Option<f64>,
}

impl PlannedInventory {
    pub fn key(&self) -> String {
        inventory_key(
            &self.part_number,
            self.location_name.as_deref(),
            self.lot_number.as_deref(),
            self.serial_number.as_deref(),
        )
    }
}

/// A lot to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLot {
    pub part_number: String,
    pub lot_number: String,
}

/// A serialized unit to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInstance {
    pub part_number: String,
    pub serial_number: String,
    pub lot_number: Option<String>,
    /// Key of the inventory record holding the unit
    pub inventory_key: String,
}

/// Everything an inventory CSV asks for, deduplicated, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadPlan {
    pub uoms: Vec<String>,
    pub locations: Vec<String>,
    pub parts: Vec<PlannedPart>,
    pub inventories: Vec<PlannedInventory>,
    pub lots: Vec<PlannedLot>,
    pub instances: Vec<PlannedInstance>,
}

/// Push `value` unless already seen
fn push_distinct<T: Clone + Eq + std::hash::Hash>(seen: &mut HashSet<T>, out: &mut Vec<T>, value: T) {
    if seen.insert(value.clone()) {
        out.push(value);
    }
}

impl UploadPlan {
    pub fn build(rows: &[InventoryRow]) -> Self {
        let mut plan = UploadPlan::default();

        let mut seen_uoms = HashSet::new();
        let mut seen_locations = HashSet::new();
        for row in rows {
            if let Some(uom) = &row.uom {
                push_distinct(&mut seen_uoms, &mut plan.uoms, uom.clone());
            }
            if let Some(location) = &row.location_name {
                push_distinct(&mut seen_locations, &mut plan.locations, location.clone());
            }
        }

        // Rows per part, parts in first-seen order
        let mut part_order: Vec<&str> = Vec::new();
        let mut by_part: HashMap<&str, Vec<&InventoryRow>> = HashMap::new();
        for row in rows {
            by_part
                .entry(row.part_number.as_str())
                .or_insert_with(|| {
                    part_order.push(row.part_number.as_str());
                    Vec::new()
                })
                .push(row);
        }

        let mut seen_lots = HashSet::new();
        let mut seen_serials = HashSet::new();
        for part_number in part_order {
            let part_rows = &by_part[part_number];
            plan.parts.push(PlannedPart {
                part_number: part_number.to_string(),
                description: part_rows.iter().find_map(|r| r.part_description.clone()),
                tracking_type: tracking_type(part_rows),
            });

            for group in inventory_groups(part_rows) {
                plan.inventories.push(group_inventory(part_number, &group));
            }

            for row in part_rows {
                if let Some(lot) = &row.lot_number {
                    if seen_lots.insert((part_number, lot.as_str())) {
                        plan.lots.push(PlannedLot {
                            part_number: part_number.to_string(),
                            lot_number: lot.clone(),
                        });
                    }
                }
                if let Some(serial) = &row.serial_number {
                    if seen_serials.insert((part_number, serial.as_str())) {
                        plan.instances.push(PlannedInstance {
                            part_number: part_number.to_string(),
                            serial_number: serial.clone(),
                            lot_number: row.lot_number.clone(),
                            inventory_key: inventory_key(
                                part_number,
                                row.location_name.as_deref(),
                                row.lot_number.as_deref(),
                                Some(serial),
                            ),
                        });
                    }
                }
            }
        }
        plan
    }

    /// The plan as a single `bulkPartUpload` input, referencing related
    /// records by natural key
    pub fn bulk_input(&self) -> Value {
        let input = BulkPartUploadInput {
            units_of_measurements: self.uoms.iter().map(|t| BulkUom { kind: t }).collect(),
            locations: self.locations.iter().map(|n| BulkLocation { name: n }).collect(),
            parts: self.parts.iter().map(PlannedPart::to_input).collect(),
            parts_inventories: self
                .inventories
                .iter()
                .map(|inv| BulkInventory {
                    part_number: &inv.part_number,
                    location_name: inv.location_name.as_deref(),
                    unit_of_measure_type: inv.uom.as_deref(),
                    quantity: inv.quantity,
                    cost: inv.cost,
                    lot_number: inv.lot_number.as_deref(),
                    serial_number: inv.serial_number.as_deref(),
                })
                .collect(),
            parts_lots: self
                .lots
                .iter()
                .map(|lot| BulkLot {
                    part_number: &lot.part_number,
                    lot_number: &lot.lot_number,
                })
                .collect(),
            parts_instances: self
                .instances
                .iter()
                .map(|inst| BulkInstance {
                    part_number: &inst.part_number,
                    serial_number: &inst.serial_number,
                    lot_number: inst.lot_number.as_deref(),
                })
                .collect(),
        };
        serde_json::to_value(input).unwrap_or(Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.uoms.is_empty() && self.locations.is_empty()
    }
}

/// Declared tracking type if the rows carry a recognizable one, else
/// serial when any row has a serial number, lot when any has a lot number
fn tracking_type(rows: &[&InventoryRow]) -> Option<TrackingType> {
    if let Some(declared) = rows
        .iter()
        .filter_map(|r| r.tracking_type.as_deref())
        .find_map(|t| t.parse().ok())
    {
        return Some(declared);
    }
    if rows.iter().any(|r| r.serial_number.is_some()) {
        Some(TrackingType::Serial)
    } else if rows.iter().any(|r| r.lot_number.is_some()) {
        Some(TrackingType::Lot)
    } else {
        None
    }
}

type GroupKey<'a> = (Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// Rows with a quantity grouped by `(location, lot, serial)`, in first-seen order
fn inventory_groups<'a>(rows: &[&'a InventoryRow]) -> Vec<Vec<&'a InventoryRow>> {
    let mut order: Vec<GroupKey<'a>> = Vec::new();
    let mut groups: HashMap<GroupKey<'a>, Vec<&'a InventoryRow>> = HashMap::new();
    for row in rows.iter().copied().filter(|r| r.quantity.is_some()) {
        let key = (
            row.location_name.as_deref(),
            row.lot_number.as_deref(),
            row.serial_number.as_deref(),
        );
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }
    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect()
}

fn group_inventory(part_number: &str, group: &[&InventoryRow]) -> PlannedInventory {
    let first = group[0];
    let serial_number = first.serial_number.clone();
    let quantity = if serial_number.is_some() {
        1.0
    } else {
        group.iter().find_map(|r| r.quantity).unwrap_or(0.0)
    };
    PlannedInventory {
        part_number: part_number.to_string(),
        location_name: first.location_name.clone(),
        lot_number: first.lot_number.clone(),
        serial_number,
        quantity,
        uom: group.iter().find_map(|r| r.uom.clone()),
        cost: group.iter().find_map(|r| r.cost),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkPartUploadInput<'a> {
    units_of_measurements: Vec<BulkUom<'a>>,
    locations: Vec<BulkLocation<'a>>,
    parts: Vec<PartInput>,
    parts_inventories: Vec<BulkInventory<'a>>,
    parts_lots: Vec<BulkLot<'a>>,
    parts_instances: Vec<BulkInstance<'a>>,
}

#[derive(Serialize)]
struct BulkUom<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct BulkLocation<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkInventory<'a> {
    part_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measure_type: Option<&'a str>,
    quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lot_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial_number: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkLot<'a> {
    part_number: &'a str,
    lot_number: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkInstance<'a> {
    part_number: &'a str,
    serial_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lot_number: Option<&'a str>,
}

/// `createPartInventory` input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInventoryInput {
    pub part_id: Value,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measure_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

/// `createPartLot` input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartLotInput {
    pub origin_part_id: Value,
    pub lot_number: String,
}

/// `createPartInstance` input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInstanceInput {
    pub origin_part_id: Value,
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_inventory_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_lot_id: Option<Value>,
}

/// `createPartLotInventory` input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartLotInventoryInput {
    pub part_inventory_id: Value,
    pub part_lot_id: Value,
    pub quantity: f64,
}

/// A row of the spreadsheet inventory import
#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub line: usize,
    pub part_number: String,
    pub serial_number: Option<String>,
    pub quantity: f64,
    pub lot_number: Option<String>,
    pub location: Option<String>,
}

impl StockRow {
    pub fn from_record(record: &Record<'_>) -> Result<Self, RowError> {
        let serial_number = record.string("serial number");
        let quantity = match &serial_number {
            Some(_) => 1.0,
            None => number(record, &["quantity"])?.ok_or_else(|| RowError::Missing {
                line: record.line,
                column: "quantity".to_string(),
            })?,
        };
        Ok(Self {
            line: record.line,
            part_number: required(record, "part number")?,
            serial_number,
            quantity,
            lot_number: record.string("lot number"),
            location: record.string("location"),
        })
    }

    pub fn to_input(&self, part_id: Value, location_id: Option<Value>) -> PartInventoryInput {
        PartInventoryInput {
            part_id,
            quantity: self.quantity,
            location_id,
            unit_of_measure_id: None,
            cost: None,
            lot_number: self.lot_number.clone(),
            serial_number: self.serial_number.clone(),
        }
    }
}
