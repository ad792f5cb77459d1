//! GraphQL documents and wire types for the import API

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::kind::EntityKind;

pub const GET_PARTS: &str = r#"
    query GetParts($filters: PartsInputFilters) {
        parts(filters: $filters) {
            edges { node { id partNumber revision description isLatestRevision } }
        }
    }
"#;

pub const GET_LOCATIONS: &str = r#"
    query GetLocations($filters: LocationsInputFilters) {
        locations(filters: $filters) {
            edges { node { id name } }
        }
    }
"#;

pub const GET_UNITS_OF_MEASUREMENTS: &str = r#"
    query GetUnitsOfMeasurements($filters: UnitsOfMeasurementInputFilters) {
        unitsOfMeasurements(filters: $filters) {
            edges { node { id type } }
        }
    }
"#;

pub const GET_PART_INVENTORIES: &str = r#"
    query GetPartInventories($filters: PartInventoriesInputFilters) {
        partInventories(filters: $filters) {
            edges {
                node {
                    id _etag quantity serialNumber lotNumber partId
                    part { partNumber } location { name }
                }
            }
        }
    }
"#;

pub const GET_PART_LOTS: &str = r#"
    query GetPartLots($filters: PartLotsInputFilters) {
        partLots(filters: $filters) {
            edges { node { id lotNumber originPartId quantity } }
        }
    }
"#;

pub const GET_PART_INSTANCES: &str = r#"
    query GetPartInstances($filters: PartInstancesInputFilters) {
        partInstances(filters: $filters) {
            edges { node { id serialNumber originPartId partInventoryId } }
        }
    }
"#;

pub const GET_MBOM_ITEMS: &str = r#"
    query GetMbomItems($filters: MbomItemsInputFilters) {
        mbomItems(filters: $filters) {
            edges { node { id partId parentId quantity } }
        }
    }
"#;

pub const GET_PROCEDURES: &str = r#"
    query GetProcedures($filters: ProceduresInputFilters) {
        procedures(filters: $filters) {
            edges { node { id title } }
        }
    }
"#;

pub const CREATE_PART: &str = r#"
    mutation CreatePart($input: CreatePartInput!) {
        createPart(input: $input) {
            part { id partNumber revision description }
        }
    }
"#;

pub const CREATE_LOCATION: &str = r#"
    mutation CreateLocation($input: CreateLocationInput!) {
        createLocation(input: $input) {
            location { id name }
        }
    }
"#;

pub const CREATE_UNITS_OF_MEASUREMENT: &str = r#"
    mutation CreateUnitOfMeasurement($input: CreateUnitOfMeasurementInput!) {
        createUnitOfMeasurement(input: $input) {
            unitOfMeasurement { id type }
        }
    }
"#;

pub const CREATE_PART_INVENTORY: &str = r#"
    mutation CreatePartInventory($input: CreatePartInventoryInput!) {
        createPartInventory(input: $input) {
            partInventory {
                id _etag quantity serialNumber lotNumber partId
                part { partNumber } location { name }
            }
        }
    }
"#;

pub const CREATE_PART_LOT: &str = r#"
    mutation CreatePartLot($input: CreatePartLotInput!) {
        createPartLot(input: $input) {
            partLot { id lotNumber originPartId quantity }
        }
    }
"#;

pub const CREATE_PART_INSTANCE: &str = r#"
    mutation CreatePartInstance($input: CreatePartInstanceInput!) {
        createPartInstance(input: $input) {
            partInstance { id serialNumber originPartId partInventoryId }
        }
    }
"#;

pub const CREATE_PART_LOT_INVENTORY: &str = r#"
    mutation CreatePartLotInventory($input: CreatePartLotInventoryInput!) {
        createPartLotInventory(input: $input) {
            partLotInventory { id partInventoryId partLotId quantity }
        }
    }
"#;

pub const CREATE_MBOM_ITEM: &str = r#"
    mutation CreateMbomItem($input: CreateMbomItemInput!) {
        createMbomItem(input: $input) {
            mbomItem { id partId parentId quantity }
        }
    }
"#;

pub const CREATE_RUN: &str = r#"
    mutation CreateRun($input: CreateRunInput!) {
        createRun(input: $input) {
            run { id title procedureId partInventoryId }
        }
    }
"#;

pub const CREATE_ABOM_FOR_PART_INVENTORY: &str = r#"
    mutation CreateAbomForPartInventory($id: ID!, $etag: String!) {
        createAbomForPartInventory(id: $id, etag: $etag) {
            abom { id }
        }
    }
"#;

pub const BULK_PART_UPLOAD: &str = r#"
    mutation BulkPartUpload($input: BulkPartUploadInput!) {
        bulkPartUpload(input: $input) {
            parts { id partNumber }
            partsInstances { id serialNumber originPartId }
            partsLots { id lotNumber originPartId quantity }
            partsInventories { id serialNumber lotNumber part { partNumber } location { name } }
            locations { id name }
            unitsOfMeasurements { id type }
        }
    }
"#;

/// Create operations the importers issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mutation {
    CreatePart,
    CreateLocation,
    CreateUnitOfMeasurement,
    CreatePartInventory,
    CreatePartLot,
    CreatePartInstance,
    CreatePartLotInventory,
    CreateMbomItem,
    CreateRun,
    CreateAbomForPartInventory,
    BulkPartUpload,
}

impl Mutation {
    /// The GraphQL document for this operation
    pub fn document(&self) -> &'static str {
        match self {
            Mutation::CreatePart => CREATE_PART,
            Mutation::CreateLocation => CREATE_LOCATION,
            Mutation::CreateUnitOfMeasurement => CREATE_UNITS_OF_MEASUREMENT,
            Mutation::CreatePartInventory => CREATE_PART_INVENTORY,
            Mutation::CreatePartLot => CREATE_PART_LOT,
            Mutation::CreatePartInstance => CREATE_PART_INSTANCE,
            Mutation::CreatePartLotInventory => CREATE_PART_LOT_INVENTORY,
            Mutation::CreateMbomItem => CREATE_MBOM_ITEM,
            Mutation::CreateRun => CREATE_RUN,
            Mutation::CreateAbomForPartInventory => CREATE_ABOM_FOR_PART_INVENTORY,
            Mutation::BulkPartUpload => BULK_PART_UPLOAD,
        }
    }

    /// Root field name of the operation in the response `data` object
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreatePart => "createPart",
            Mutation::CreateLocation => "createLocation",
            Mutation::CreateUnitOfMeasurement => "createUnitOfMeasurement",
            Mutation::CreatePartInventory => "createPartInventory",
            Mutation::CreatePartLot => "createPartLot",
            Mutation::CreatePartInstance => "createPartInstance",
            Mutation::CreatePartLotInventory => "createPartLotInventory",
            Mutation::CreateMbomItem => "createMbomItem",
            Mutation::CreateRun => "createRun",
            Mutation::CreateAbomForPartInventory => "createAbomForPartInventory",
            Mutation::BulkPartUpload => "bulkPartUpload",
        }
    }

    /// Kind of record the operation creates
    pub fn kind(&self) -> EntityKind {
        match self {
            Mutation::CreatePart | Mutation::BulkPartUpload => EntityKind::Part,
            Mutation::CreateLocation => EntityKind::Location,
            Mutation::CreateUnitOfMeasurement => EntityKind::UnitOfMeasure,
            Mutation::CreatePartInventory => EntityKind::PartInventory,
            Mutation::CreatePartLot => EntityKind::PartLot,
            Mutation::CreatePartInstance => EntityKind::PartInstance,
            Mutation::CreatePartLotInventory => EntityKind::PartLotInventory,
            Mutation::CreateMbomItem => EntityKind::MbomItem,
            Mutation::CreateRun => EntityKind::Run,
            Mutation::CreateAbomForPartInventory => EntityKind::Abom,
        }
    }
}

/// Collection queries used to find records that already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Parts,
    Locations,
    UnitsOfMeasurements,
    PartInventories,
    PartLots,
    PartInstances,
    MbomItems,
    Procedures,
}

impl Query {
    pub fn document(&self) -> &'static str {
        match self {
            Query::Parts => GET_PARTS,
            Query::Locations => GET_LOCATIONS,
            Query::UnitsOfMeasurements => GET_UNITS_OF_MEASUREMENTS,
            Query::PartInventories => GET_PART_INVENTORIES,
            Query::PartLots => GET_PART_LOTS,
            Query::PartInstances => GET_PART_INSTANCES,
            Query::MbomItems => GET_MBOM_ITEMS,
            Query::Procedures => GET_PROCEDURES,
        }
    }

    /// Kind of the nodes the query returns
    pub fn kind(&self) -> EntityKind {
        match self {
            Query::Parts => EntityKind::Part,
            Query::Locations => EntityKind::Location,
            Query::UnitsOfMeasurements => EntityKind::UnitOfMeasure,
            Query::PartInventories => EntityKind::PartInventory,
            Query::PartLots => EntityKind::PartLot,
            Query::PartInstances => EntityKind::PartInstance,
            Query::MbomItems => EntityKind::MbomItem,
            Query::Procedures => EntityKind::Procedure,
        }
    }
}

/// One GraphQL operation as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub variables: Value,
}

impl GraphqlRequest {
    /// A create mutation taking a single `input` variable
    pub fn mutation(mutation: Mutation, input: Value) -> Self {
        Self {
            query: mutation.document(),
            variables: json!({ "input": input }),
        }
    }

    /// A collection query with an `in`-list filter on one field, plus any
    /// additional filters
    pub fn filter_in(query: Query, field: &str, values: &[Value], extra: Map<String, Value>) -> Self {
        let mut filters = extra;
        filters.insert(field.to_string(), json!({ "in": values }));
        Self {
            query: query.document(),
            variables: json!({ "filters": filters }),
        }
    }
}

/// A GraphQL error entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
}

/// Response for one GraphQL operation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    /// First error message, if the operation failed
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }

    /// Nodes of a relay-style connection (`data.<field>.edges[].node`)
    pub fn nodes(&self) -> Vec<Value> {
        let Some(Value::Object(data)) = &self.data else {
            return Vec::new();
        };
        data.values()
            .filter_map(|connection| connection.get("edges").and_then(Value::as_array))
            .flatten()
            .filter_map(|edge| edge.get("node").cloned())
            .collect()
    }
}
