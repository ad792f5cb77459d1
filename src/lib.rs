//! ion-importers: batch imports into the ion manufacturing API
//!
//! Reads BOM, inventory and run exports (spreadsheets or CSV), reshapes them
//! into API payloads, resolves references against records that already
//! exist and creates the rest through batched GraphQL mutations.

pub mod cli;
pub mod core;
pub mod entities;
