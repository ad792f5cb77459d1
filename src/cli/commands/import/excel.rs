//! `ion-import excel` - parts or inventory from a spreadsheet

use console::style;
use miette::Result;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

use super::common::{convert_rows, print_summary, ImportStats};
use crate::cli::helpers::{connect, ConnectionArgs};
use crate::cli::GlobalOpts;
use crate::core::cache::ResolutionCache;
use crate::core::client::{ApiClient, ApiError};
use crate::core::graphql::{Mutation, Query};
use crate::core::kind::{inventory_key, scalar, EntityKind};
use crate::core::loader::Table;
use crate::core::resolver::{lookup_existing, Lookup};
use crate::core::runner::{run_batch, PendingMutation};
use crate::entities::{PartRow, StockRow};

/// What the spreadsheet holds
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SheetType {
    /// Part Number, Description, Tracking Level, Revision
    #[default]
    Parts,
    /// Part Number, Serial Number, Quantity, Lot Number, Location
    Inventory,
}

#[derive(clap::Args, Debug)]
pub struct ExcelArgs {
    /// Path to the spreadsheet (.xlsx, .xls, .ods) or CSV
    pub input_file: PathBuf,

    /// Type of records in the sheet
    #[arg(long = "type", value_enum, default_value_t = SheetType::Parts)]
    pub sheet_type: SheetType,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub fn run(args: ExcelArgs, _global: &GlobalOpts) -> Result<()> {
    let table = Table::load(&args.input_file)?;
    table.require(&["part number"])?;

    println!(
        "{} Importing {} from {} ({} rows)",
        style("→").blue(),
        match args.sheet_type {
            SheetType::Parts => "parts",
            SheetType::Inventory => "inventory",
        },
        style(args.input_file.display()).yellow(),
        table.len()
    );

    let (stats, title) = match args.sheet_type {
        SheetType::Parts => {
            let (rows, rejected) = convert_rows(&table, PartRow::from_record);
            let client = connect(&args.connection)?;
            info!("Starting parts importer.");
            let mut stats = import_parts(&client, &rows)?;
            stats.skipped += rejected;
            stats.rows_processed += rejected;
            (stats, "Parts Import Summary")
        }
        SheetType::Inventory => {
            let (rows, rejected) = convert_rows(&table, StockRow::from_record);
            let client = connect(&args.connection)?;
            info!("Starting inventory importer.");
            let mut stats = import_stock(&client, &rows)?;
            stats.skipped += rejected;
            stats.rows_processed += rejected;
            (stats, "Inventory Import Summary")
        }
    };
    info!("Importing finished!");

    print_summary(title, &stats);
    Ok(())
}

/// Create parts whose `(partNumber, revision)` pair does not exist yet
pub fn import_parts(client: &ApiClient, rows: &[PartRow]) -> Result<ImportStats, ApiError> {
    let mut stats = ImportStats::new(rows.len(), 0);
    let mut cache = ResolutionCache::new();

    // Every revision counts here, so no latest-revision filter
    let lookup = Lookup::new(Query::Parts, "partNumber")
        .values(rows.iter().map(|r| r.part_number.as_str()));
    let mut taken: HashSet<(String, String)> = lookup_existing(client, &mut cache, &lookup)?
        .iter()
        .filter_map(|node| {
            Some((
                scalar(node, "partNumber")?,
                scalar(node, "revision").unwrap_or_default(),
            ))
        })
        .collect();

    let mut batch = Vec::new();
    for row in rows {
        if !taken.insert(row.revision_key()) {
            warn!("Cannot create part {} because it already exists.", row.part_number);
            stats.existing += 1;
            continue;
        }
        batch.push(PendingMutation::create_input(
            Mutation::CreatePart,
            &row.to_input(),
            format!("'{}'", row.part_number),
        )?);
    }

    stats.report.absorb(run_batch(client, &mut cache, &batch)?);
    Ok(stats)
}

/// Create one inventory record per row against existing parts and locations.
///
/// Only records already in the API count as present; repeated rows in the
/// sheet each add their own quantity.
pub fn import_stock(client: &ApiClient, rows: &[StockRow]) -> Result<ImportStats, ApiError> {
    let mut stats = ImportStats::new(rows.len(), 0);
    let mut cache = ResolutionCache::new();

    let parts = Lookup::new(Query::Parts, "partNumber")
        .values(rows.iter().map(|r| r.part_number.as_str()))
        .latest_revision();
    lookup_existing(client, &mut cache, &parts)?;
    let locations =
        Lookup::new(Query::Locations, "name").values(rows.iter().filter_map(|r| r.location.as_deref()));
    lookup_existing(client, &mut cache, &locations)?;

    let part_ids: Vec<Value> = rows
        .iter()
        .filter_map(|r| cache.id(EntityKind::Part, &r.part_number))
        .collect();
    lookup_existing(
        client,
        &mut cache,
        &Lookup::new(Query::PartInventories, "partId").values(part_ids),
    )?;

    let mut batch = Vec::new();
    for row in rows {
        let Some(part_id) = cache.id(EntityKind::Part, &row.part_number) else {
            warn!(
                "Skipping row {} because part {} does not exist.",
                row.line, row.part_number
            );
            stats.skipped += 1;
            continue;
        };

        // Unknown locations are sent as no location
        let location = row
            .location
            .as_deref()
            .filter(|name| cache.contains(EntityKind::Location, name));
        let location_id = location.and_then(|name| cache.id(EntityKind::Location, name));
        if row.location.is_some() && location.is_none() {
            warn!(
                "Location {} on row {} was not found; importing without a location.",
                row.location.as_deref().unwrap_or_default(),
                row.line
            );
        }

        let key = inventory_key(
            &row.part_number,
            location,
            row.lot_number.as_deref(),
            row.serial_number.as_deref(),
        );
        if cache.contains(EntityKind::PartInventory, &key) {
            stats.existing += 1;
            continue;
        }

        batch.push(PendingMutation::create_input(
            Mutation::CreatePartInventory,
            &row.to_input(part_id, location_id),
            format!("'{}'", key),
        )?);
    }

    stats.report.absorb(run_batch(client, &mut cache, &batch)?);
    Ok(stats)
}
