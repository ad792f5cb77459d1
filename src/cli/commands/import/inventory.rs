//! `ion-import inventory` - inventory CSV import
//!
//! Records are created tier by tier so every foreign key exists before it is
//! referenced:
//!
//! 1. units of measure, locations, parts
//! 2. inventories, lots
//! 3. part instances, lot/inventory links
//!
//! Each tier starts with lookups of what already exists and ends with one
//! batched call. With `--bulk` the whole plan goes out as a single
//! `bulkPartUpload` mutation instead.

use console::style;
use miette::Result;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn};

use super::common::{convert_rows, print_summary, ImportStats};
use crate::cli::helpers::{connect, ConnectionArgs};
use crate::cli::GlobalOpts;
use crate::core::cache::ResolutionCache;
use crate::core::client::{ApiClient, ApiError};
use crate::core::graphql::{Mutation, Query};
use crate::core::kind::{pair_key, EntityKind};
use crate::core::loader::Table;
use crate::core::resolver::{lookup_existing, retain_unresolved, Lookup};
use crate::core::runner::{run_batch, PendingMutation};
use crate::entities::inventory::{
    PartInstanceInput, PartInventoryInput, PartLotInput, PartLotInventoryInput, PlannedInventory,
};
use crate::entities::{InventoryRow, UploadPlan};

#[derive(clap::Args, Debug)]
pub struct InventoryArgs {
    /// Path to the inventory CSV
    pub input_file: PathBuf,

    /// Send everything as one bulkPartUpload mutation
    #[arg(long)]
    pub bulk: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub fn run(args: InventoryArgs, _global: &GlobalOpts) -> Result<()> {
    let table = Table::load(&args.input_file)?;
    table.require(&InventoryRow::REQUIRED_COLUMNS)?;
    let (rows, rejected) = convert_rows(&table, InventoryRow::from_record);

    println!(
        "{} Importing inventory from {} ({} rows)",
        style("→").blue(),
        style(args.input_file.display()).yellow(),
        rows.len()
    );

    let client = connect(&args.connection)?;
    info!("Starting inventory importer.");
    let mut stats = if args.bulk {
        import_inventory_bulk(&client, &rows)?
    } else {
        import_inventory(&client, &rows)?
    };
    stats.skipped += rejected;
    stats.rows_processed += rejected;
    info!("Importing finished!");

    print_summary("Inventory Import Summary", &stats);
    Ok(())
}

/// Send the whole plan as one `bulkPartUpload`
pub fn import_inventory_bulk(client: &ApiClient, rows: &[InventoryRow]) -> Result<ImportStats, ApiError> {
    let mut stats = ImportStats::new(rows.len(), 0);
    let plan = UploadPlan::build(rows);
    if plan.is_empty() {
        return Ok(stats);
    }
    let mut cache = ResolutionCache::new();
    let batch = vec![PendingMutation::create(
        Mutation::BulkPartUpload,
        plan.bulk_input(),
        format!("upload of {} part(s)", plan.parts.len()),
    )];
    stats.report.absorb(run_batch(client, &mut cache, &batch)?);
    Ok(stats)
}

/// Create the plan tier by tier, skipping whatever already exists
pub fn import_inventory(client: &ApiClient, rows: &[InventoryRow]) -> Result<ImportStats, ApiError> {
    let mut stats = ImportStats::new(rows.len(), 0);
    let plan = UploadPlan::build(rows);
    let mut cache = ResolutionCache::new();

    create_first_tier(client, &mut cache, &plan, &mut stats)?;
    let new_inventories = create_second_tier(client, &mut cache, &plan, &mut stats)?;
    create_third_tier(client, &mut cache, &plan, &new_inventories, &mut stats)?;

    info!("Resolved records: {:?}", cache.summary());
    Ok(stats)
}

/// Units of measure, locations and parts
fn create_first_tier(
    client: &ApiClient,
    cache: &mut ResolutionCache,
    plan: &UploadPlan,
    stats: &mut ImportStats,
) -> Result<(), ApiError> {
    let lookups = [
        Lookup::new(Query::UnitsOfMeasurements, "type").values(plan.uoms.iter().map(String::as_str)),
        Lookup::new(Query::Locations, "name").values(plan.locations.iter().map(String::as_str)),
        Lookup::new(Query::Parts, "partNumber")
            .values(plan.parts.iter().map(|p| p.part_number.as_str()))
            .latest_revision(),
    ];
    for lookup in &lookups {
        lookup_existing(client, cache, lookup)?;
    }

    let uoms = retain_unresolved(cache, EntityKind::UnitOfMeasure, plan.uoms.clone(), Clone::clone);
    let locations = retain_unresolved(cache, EntityKind::Location, plan.locations.clone(), Clone::clone);
    let parts = retain_unresolved(cache, EntityKind::Part, plan.parts.clone(), |p| {
        p.part_number.clone()
    });
    stats.existing += plan.uoms.len() - uoms.len();
    stats.existing += plan.locations.len() - locations.len();
    stats.existing += plan.parts.len() - parts.len();

    let mut batch = Vec::new();
    batch.extend(uoms.iter().map(|uom| {
        PendingMutation::create(
            Mutation::CreateUnitOfMeasurement,
            json!({ "type": uom }),
            format!("'{}'", uom),
        )
    }));
    batch.extend(locations.iter().map(|name| {
        PendingMutation::create(
            Mutation::CreateLocation,
            json!({ "name": name }),
            format!("'{}'", name),
        )
    }));
    for part in parts {
        batch.push(PendingMutation::create_input(
            Mutation::CreatePart,
            &part.to_input(),
            format!("'{}'", part.part_number),
        )?);
    }
    stats.report.absorb(run_batch(client, cache, &batch)?);
    Ok(())
}

/// Inventories and lots. Returns the inventories sent for creation.
fn create_second_tier<'p>(
    client: &ApiClient,
    cache: &mut ResolutionCache,
    plan: &'p UploadPlan,
    stats: &mut ImportStats,
) -> Result<Vec<&'p PlannedInventory>, ApiError> {
    let part_ids: Vec<Value> = plan
        .parts
        .iter()
        .filter_map(|p| cache.id(EntityKind::Part, &p.part_number))
        .collect();
    let lot_part_ids: Vec<Value> = plan
        .lots
        .iter()
        .filter_map(|lot| cache.id(EntityKind::Part, &lot.part_number))
        .collect();
    lookup_existing(
        client,
        cache,
        &Lookup::new(Query::PartInventories, "partId").values(part_ids),
    )?;
    lookup_existing(
        client,
        cache,
        &Lookup::new(Query::PartLots, "originPartId").values(lot_part_ids),
    )?;

    let mut batch = Vec::new();
    let mut sent = Vec::new();
    for inventory in &plan.inventories {
        if cache.contains(EntityKind::PartInventory, &inventory.key()) {
            stats.existing += 1;
            continue;
        }
        let Some(input) = inventory_input(cache, inventory) else {
            stats.skipped += 1;
            continue;
        };
        batch.push(PendingMutation::create_input(
            Mutation::CreatePartInventory,
            &input,
            format!("'{}'", inventory.key()),
        )?);
        sent.push(inventory);
    }

    for lot in &plan.lots {
        let (Some(part_key), Some(origin_part_id)) = (
            cache.id_key(EntityKind::Part, &lot.part_number),
            cache.id(EntityKind::Part, &lot.part_number),
        ) else {
            warn!(
                "Skipping lot {} because part {} was not found.",
                lot.lot_number, lot.part_number
            );
            stats.skipped += 1;
            continue;
        };
        if cache.contains(EntityKind::PartLot, &pair_key(&part_key, &lot.lot_number)) {
            stats.existing += 1;
            continue;
        }
        let input = PartLotInput {
            origin_part_id,
            lot_number: lot.lot_number.clone(),
        };
        batch.push(PendingMutation::create_input(
            Mutation::CreatePartLot,
            &input,
            format!("'{}' of part {}", lot.lot_number, lot.part_number),
        )?);
    }

    stats.report.absorb(run_batch(client, cache, &batch)?);
    Ok(sent)
}

/// Resolve the foreign keys of a planned inventory, warning about the first
/// one that cannot be resolved
fn inventory_input(cache: &ResolutionCache, inventory: &PlannedInventory) -> Option<PartInventoryInput> {
    let Some(part_id) = cache.id(EntityKind::Part, &inventory.part_number) else {
        warn!(
            "Skipping inventory {} because part {} was not found.",
            inventory.key(),
            inventory.part_number
        );
        return None;
    };
    let location_id = match &inventory.location_name {
        Some(name) => match cache.id(EntityKind::Location, name) {
            Some(id) => Some(id),
            None => {
                warn!(
                    "Skipping inventory {} because location {} was not found.",
                    inventory.key(),
                    name
                );
                return None;
            }
        },
        None => None,
    };
    let unit_of_measure_id = match &inventory.uom {
        Some(uom) => match cache.id(EntityKind::UnitOfMeasure, uom) {
            Some(id) => Some(id),
            None => {
                warn!(
                    "Skipping inventory {} because unit of measure {} was not found.",
                    inventory.key(),
                    uom
                );
                return None;
            }
        },
        None => None,
    };
    Some(PartInventoryInput {
        part_id,
        quantity: inventory.quantity,
        location_id,
        unit_of_measure_id,
        cost: inventory.cost,
        lot_number: inventory.lot_number.clone(),
        serial_number: inventory.serial_number.clone(),
    })
}

/// Part instances, and links between newly created inventories and their lots
fn create_third_tier(
    client: &ApiClient,
    cache: &mut ResolutionCache,
    plan: &UploadPlan,
    new_inventories: &[&PlannedInventory],
    stats: &mut ImportStats,
) -> Result<(), ApiError> {
    let serial_part_ids: Vec<Value> = plan
        .instances
        .iter()
        .filter_map(|inst| cache.id(EntityKind::Part, &inst.part_number))
        .collect();
    lookup_existing(
        client,
        cache,
        &Lookup::new(Query::PartInstances, "originPartId").values(serial_part_ids),
    )?;

    let mut batch = Vec::new();
    for instance in &plan.instances {
        let (Some(part_key), Some(origin_part_id)) = (
            cache.id_key(EntityKind::Part, &instance.part_number),
            cache.id(EntityKind::Part, &instance.part_number),
        ) else {
            warn!(
                "Skipping part instance {} because part {} was not found.",
                instance.serial_number, instance.part_number
            );
            stats.skipped += 1;
            continue;
        };
        if cache.contains(
            EntityKind::PartInstance,
            &pair_key(&part_key, &instance.serial_number),
        ) {
            stats.existing += 1;
            continue;
        }
        let part_lot_id = instance
            .lot_number
            .as_ref()
            .and_then(|lot| cache.id(EntityKind::PartLot, &pair_key(&part_key, lot)));
        let input = PartInstanceInput {
            origin_part_id,
            serial_number: instance.serial_number.clone(),
            part_inventory_id: cache.id(EntityKind::PartInventory, &instance.inventory_key),
            part_lot_id,
        };
        batch.push(PendingMutation::create_input(
            Mutation::CreatePartInstance,
            &input,
            format!("'{}' of part {}", instance.serial_number, instance.part_number),
        )?);
    }

    for inventory in new_inventories {
        let Some(lot_number) = &inventory.lot_number else {
            continue;
        };
        let Some(part_key) = cache.id_key(EntityKind::Part, &inventory.part_number) else {
            continue;
        };
        let (Some(part_inventory_id), Some(part_lot_id)) = (
            cache.id(EntityKind::PartInventory, &inventory.key()),
            cache.id(EntityKind::PartLot, &pair_key(&part_key, lot_number)),
        ) else {
            warn!(
                "Skipping lot link for inventory {} because the inventory or lot {} was not created.",
                inventory.key(),
                lot_number
            );
            stats.skipped += 1;
            continue;
        };
        let input = PartLotInventoryInput {
            part_inventory_id,
            part_lot_id,
            quantity: inventory.quantity,
        };
        batch.push(PendingMutation::create_input(
            Mutation::CreatePartLotInventory,
            &input,
            format!("'{}'", inventory.key()),
        )?);
    }

    stats.report.absorb(run_batch(client, cache, &batch)?);
    Ok(())
}
