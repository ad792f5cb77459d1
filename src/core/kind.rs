//! Entity kinds known to the importer
//!
//! Every object the API hands back is filed under an [`EntityKind`]. The kind
//! decides which natural key identifies the object, so a record found by a
//! query and the same record returned by a create mutation land on the same
//! cache entry.

use phf::phf_map;
use serde_json::Value;

/// Kinds of API records the importers read or create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Part,
    Location,
    UnitOfMeasure,
    PartInventory,
    PartLot,
    PartInstance,
    PartLotInventory,
    MbomItem,
    Procedure,
    Run,
    Abom,
}

/// Response field names mapped to the kind of object they carry.
///
/// Single-object fields come from the `create*` payloads, plural fields from
/// `bulkPartUpload`.
static RESPONSE_FIELDS: phf::Map<&'static str, EntityKind> = phf_map! {
    "part" => EntityKind::Part,
    "parts" => EntityKind::Part,
    "location" => EntityKind::Location,
    "locations" => EntityKind::Location,
    "unitOfMeasurement" => EntityKind::UnitOfMeasure,
    "unitsOfMeasurements" => EntityKind::UnitOfMeasure,
    "partInventory" => EntityKind::PartInventory,
    "partsInventories" => EntityKind::PartInventory,
    "partLot" => EntityKind::PartLot,
    "partsLots" => EntityKind::PartLot,
    "partInstance" => EntityKind::PartInstance,
    "partsInstances" => EntityKind::PartInstance,
    "partLotInventory" => EntityKind::PartLotInventory,
    "mbomItem" => EntityKind::MbomItem,
    "procedure" => EntityKind::Procedure,
    "run" => EntityKind::Run,
    "abom" => EntityKind::Abom,
};

impl EntityKind {
    /// Look up the kind carried by a mutation payload field
    pub fn from_response_field(field: &str) -> Option<EntityKind> {
        RESPONSE_FIELDS.get(field).copied()
    }

    /// Human-readable name used in log messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Part => "part",
            EntityKind::Location => "location",
            EntityKind::UnitOfMeasure => "unit of measure",
            EntityKind::PartInventory => "part inventory",
            EntityKind::PartLot => "part lot",
            EntityKind::PartInstance => "part instance",
            EntityKind::PartLotInventory => "lot inventory link",
            EntityKind::MbomItem => "BOM item",
            EntityKind::Procedure => "procedure",
            EntityKind::Run => "run",
            EntityKind::Abom => "as-built BOM",
        }
    }

    /// Compute the natural key of an API object of this kind.
    ///
    /// Returns `None` when the object lacks the fields the key is built from.
    pub fn natural_key(&self, object: &Value) -> Option<String> {
        match self {
            EntityKind::Part => scalar(object, "partNumber"),
            EntityKind::Location => scalar(object, "name"),
            EntityKind::UnitOfMeasure => scalar(object, "type"),
            EntityKind::PartInventory => {
                let part_number = scalar(object, "partNumber").or_else(|| {
                    object.get("part").and_then(|p| scalar(p, "partNumber"))
                })?;
                let location = object
                    .get("location")
                    .and_then(|l| scalar(l, "name"))
                    .or_else(|| scalar(object, "locationName"));
                Some(inventory_key(
                    &part_number,
                    location.as_deref(),
                    scalar(object, "lotNumber").as_deref(),
                    scalar(object, "serialNumber").as_deref(),
                ))
            }
            EntityKind::PartLot => Some(pair_key(
                &scalar(object, "originPartId")?,
                &scalar(object, "lotNumber")?,
            )),
            EntityKind::PartInstance => Some(pair_key(
                &scalar(object, "originPartId")?,
                &scalar(object, "serialNumber")?,
            )),
            EntityKind::PartLotInventory => Some(pair_key(
                &scalar(object, "partInventoryId")?,
                &scalar(object, "partLotId")?,
            )),
            EntityKind::MbomItem => Some(pair_key(
                &scalar(object, "partId")?,
                &scalar(object, "parentId")?,
            )),
            EntityKind::Procedure | EntityKind::Run | EntityKind::Abom => scalar(object, "id"),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Render a JSON scalar as a key component. Nulls and empty strings are absent.
pub fn scalar(object: &Value, field: &str) -> Option<String> {
    value_key(object.get(field)?)
}

/// Render a JSON scalar (usually an id) the way natural keys render it
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Key for records identified by two foreign identifiers
pub fn pair_key(first: &str, second: &str) -> String {
    format!("{}|{}", first, second)
}

/// Key for part inventory.
///
/// A serial number identifies a unit within its part, so serialized
/// inventory is keyed by part and serial alone; everything else is keyed by
/// where it sits and which lot it belongs to.
pub fn inventory_key(
    part_number: &str,
    location: Option<&str>,
    lot_number: Option<&str>,
    serial_number: Option<&str>,
) -> String {
    match serial_number {
        Some(serial) if !serial.is_empty() => format!("{}#{}", part_number, serial),
        _ => format!(
            "{}@{}/{}",
            part_number,
            location.unwrap_or_default(),
            lot_number.unwrap_or_default()
        ),
    }
}
