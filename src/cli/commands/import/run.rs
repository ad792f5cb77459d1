//! `ion-import runs` - start runs against serialized units

use console::style;
use miette::Result;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

use super::common::{convert_rows, print_summary, ImportStats};
use crate::cli::helpers::{connect, ConnectionArgs};
use crate::cli::GlobalOpts;
use crate::core::cache::ResolutionCache;
use crate::core::client::{ApiClient, ApiError};
use crate::core::graphql::{Mutation, Query};
use crate::core::kind::{inventory_key, scalar, value_key, EntityKind};
use crate::core::loader::Table;
use crate::core::resolver::{lookup_existing, Lookup};
use crate::core::runner::{run_batch, PendingMutation};
use crate::entities::inventory::PartInventoryInput;
use crate::entities::{RunInput, RunRow};

#[derive(clap::Args, Debug)]
pub struct RunsArgs {
    /// Path to the run CSV
    pub input_file: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub fn run(args: RunsArgs, _global: &GlobalOpts) -> Result<()> {
    let table = Table::load(&args.input_file)?;
    table.require(&RunRow::REQUIRED_COLUMNS)?;
    let (rows, rejected) = convert_rows(&table, RunRow::from_record);

    println!(
        "{} Importing runs from {} ({} rows)",
        style("→").blue(),
        style(args.input_file.display()).yellow(),
        rows.len()
    );

    let client = connect(&args.connection)?;
    info!("Starting runs importer.");
    let mut stats = import_runs(&client, &rows)?;
    stats.skipped += rejected;
    stats.rows_processed += rejected;
    info!("Importing finished!");

    print_summary("Runs Import Summary", &stats);
    Ok(())
}

fn unit_key(row: &RunRow) -> String {
    inventory_key(&row.part_number, None, None, Some(&row.serial_number))
}

/// Create the serialized inventory each run needs, then the runs and one
/// as-built BOM per unit
pub fn import_runs(client: &ApiClient, rows: &[RunRow]) -> Result<ImportStats, ApiError> {
    let mut stats = ImportStats::new(rows.len(), 0);
    let mut cache = ResolutionCache::new();

    let parts = Lookup::new(Query::Parts, "partNumber")
        .values(rows.iter().map(|r| r.part_number.as_str()))
        .latest_revision();
    lookup_existing(client, &mut cache, &parts)?;
    let procedures =
        Lookup::new(Query::Procedures, "id").values(rows.iter().map(|r| r.procedure_id.clone()));
    lookup_existing(client, &mut cache, &procedures)?;

    let part_ids: Vec<Value> = rows
        .iter()
        .filter_map(|r| cache.id(EntityKind::Part, &r.part_number))
        .collect();
    lookup_existing(
        client,
        &mut cache,
        &Lookup::new(Query::PartInventories, "partId").values(part_ids),
    )?;

    // Serialized inventory for units that have none yet
    let mut queued = HashSet::new();
    let mut inventory_batch = Vec::new();
    for row in rows {
        let key = unit_key(row);
        let Some(part_id) = cache.id(EntityKind::Part, &row.part_number) else {
            continue;
        };
        if cache.contains(EntityKind::PartInventory, &key) {
            if queued.insert(key) {
                stats.existing += 1;
            }
            continue;
        }
        if !queued.insert(key.clone()) {
            continue;
        }
        let input = PartInventoryInput {
            part_id,
            quantity: 1.0,
            location_id: None,
            unit_of_measure_id: None,
            cost: None,
            lot_number: None,
            serial_number: Some(row.serial_number.clone()),
        };
        inventory_batch.push(PendingMutation::create_input(
            Mutation::CreatePartInventory,
            &input,
            format!("'{}'", key),
        )?);
    }
    stats
        .report
        .absorb(run_batch(client, &mut cache, &inventory_batch)?);

    let mut batch = Vec::new();
    let mut units = Vec::new();
    for row in rows {
        let Some(part_id) = cache.id(EntityKind::Part, &row.part_number) else {
            warn!(
                "Skipping run on row {} because part {} does not exist.",
                row.line, row.part_number
            );
            stats.skipped += 1;
            continue;
        };
        let procedure = value_key(&row.procedure_id)
            .and_then(|key| cache.get(EntityKind::Procedure, &key));
        let Some(procedure) = procedure else {
            warn!(
                "Skipping run on row {} because procedure {} does not exist.",
                row.line, row.procedure_id
            );
            stats.skipped += 1;
            continue;
        };

        let key = unit_key(row);
        let input = RunInput {
            title: row.title_or_default(scalar(procedure, "title").as_deref()),
            procedure_id: row.procedure_id.clone(),
            part_inventory_id: cache.id(EntityKind::PartInventory, &key),
            part_id: Some(part_id),
        };
        batch.push(PendingMutation::create_input(
            Mutation::CreateRun,
            &input,
            format!("'{}'", input.title),
        )?);
        if !units.contains(&key) {
            units.push(key);
        }
    }

    for key in &units {
        let Some(inventory) = cache.get(EntityKind::PartInventory, key) else {
            continue;
        };
        let (Some(id), Some(etag)) = (inventory.get("id"), scalar(inventory, "_etag")) else {
            warn!("Skipping as-built BOM for {} because its inventory has no etag.", key);
            stats.skipped += 1;
            continue;
        };
        batch.push(PendingMutation::with_variables(
            Mutation::CreateAbomForPartInventory,
            json!({ "id": id, "etag": etag }),
            format!("for {}", key),
        ));
    }

    stats.report.absorb(run_batch(client, &mut cache, &batch)?);
    Ok(stats)
}
