//! Typed input rows and API payloads
//!
//! Each importer converts its input table into typed rows once, right after
//! loading:
//!
//! - [`BomRow`] - a line of a CAD BOM export, positioned by level or depth
//! - [`InventoryRow`] - stock from an inventory CSV, grouped into an [`UploadPlan`]
//! - [`PartRow`] / [`StockRow`] - the spreadsheet parts and inventory imports
//! - [`RunRow`] - a run to start against a serialized unit
//!
//! The `*Input` structs serialize to the camelCase objects the API accepts.

pub mod bom;
pub mod inventory;
pub mod part;
pub mod row;
pub mod run;

pub use bom::{BomLayout, BomRow, MbomItemInput};
pub use inventory::{InventoryRow, StockRow, UploadPlan};
pub use part::{PartInput, PartRow, TrackingType};
pub use row::RowError;
pub use run::{RunInput, RunRow};
