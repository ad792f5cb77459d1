//! Import commands - push spreadsheet and CSV data into the API
//!
//! Every importer follows the same shape: load the table, convert its rows,
//! authenticate, resolve what already exists, create the rest in batches and
//! print a summary. Per-row failures are logged and counted; the command still
//! succeeds.

pub mod bom;
pub mod common;
pub mod excel;
pub mod inventory;
pub mod run;

pub use bom::BomArgs;
pub use common::ImportStats;
pub use excel::ExcelArgs;
pub use inventory::InventoryArgs;
pub use run::RunsArgs;
