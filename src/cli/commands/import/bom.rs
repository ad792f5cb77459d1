//! `ion-import bom` - BOM import from CAD exports
//!
//! The input lists one part per row with its place in the assembly tree. For
//! dot-notation exports the top-level assembly is not a row: its part number
//! is the input file's name.

use console::style;
use miette::Result;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::common::{convert_rows, print_summary, ImportStats};
use crate::cli::helpers::{connect, ConnectionArgs};
use crate::cli::GlobalOpts;
use crate::core::cache::ResolutionCache;
use crate::core::client::{ApiClient, ApiError};
use crate::core::graphql::{Mutation, Query};
use crate::core::hierarchy::{edges_from_depths, edges_from_levels, BomEdge};
use crate::core::kind::{pair_key, value_key, EntityKind};
use crate::core::loader::Table;
use crate::core::resolver::{lookup_existing, Lookup};
use crate::core::runner::{run_batch, run_batch_with, FailureKind, PendingMutation};
use crate::entities::bom::{depth_lines, level_lines, BomLayout, BomRow, MbomItemInput};
use crate::entities::PartInput;

/// Which column carries the hierarchy
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HierarchyMode {
    /// Use `Level` when present, otherwise `Depth`
    #[default]
    Auto,
    /// Dot-notation `Level` column (1, 1.1, 1.1.2)
    Level,
    /// Integer `Depth` column
    Depth,
}

impl HierarchyMode {
    fn preferred(self) -> Option<BomLayout> {
        match self {
            HierarchyMode::Auto => None,
            HierarchyMode::Level => Some(BomLayout::Level),
            HierarchyMode::Depth => Some(BomLayout::Depth),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct BomArgs {
    /// Path to the BOM export (.xlsx, .xls, .ods or .csv)
    pub input_file: PathBuf,

    /// Column that encodes the hierarchy
    #[arg(long, value_enum, default_value_t = HierarchyMode::Auto)]
    pub hierarchy: HierarchyMode,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub fn run(args: BomArgs, _global: &GlobalOpts) -> Result<()> {
    let table = Table::load(&args.input_file)?;
    let layout = BomLayout::detect(&table, args.hierarchy.preferred())?;
    let (rows, rejected) = convert_rows(&table, |r| BomRow::from_record(r, layout));
    let top_part_number = top_level_part_number(&args.input_file)?;

    println!(
        "{} Importing BOM {} from {} ({} rows)",
        style("→").blue(),
        style(&top_part_number).cyan(),
        style(args.input_file.display()).yellow(),
        rows.len()
    );

    let client = connect(&args.connection)?;
    info!("Starting BOM importer.");
    let mut stats = import_bom(&client, &top_part_number, layout, &rows)?;
    stats.skipped += rejected;
    stats.rows_processed += rejected;
    info!("Importing finished!");

    print_summary("BOM Import Summary", &stats);
    Ok(())
}

/// Part number of the top-level assembly: the input file name without
/// extension
pub fn top_level_part_number(path: &std::path::Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| miette::miette!("Cannot derive a part number from {}", path.display()))
}

/// Parent/child edges for the rows, plus the part numbers they involve in
/// first-seen order
fn plan_edges(top_part_number: &str, layout: BomLayout, rows: &[BomRow]) -> (Vec<BomEdge>, Vec<String>) {
    let edges = match layout {
        BomLayout::Level => edges_from_levels(top_part_number, &level_lines(rows)),
        BomLayout::Depth => edges_from_depths(&depth_lines(rows)),
    };

    let mut seen = HashSet::new();
    let mut part_numbers = Vec::new();
    if layout == BomLayout::Level {
        seen.insert(top_part_number.to_string());
        part_numbers.push(top_part_number.to_string());
    }
    for row in rows {
        if seen.insert(row.part_number.clone()) {
            part_numbers.push(row.part_number.clone());
        }
    }
    (edges, part_numbers)
}

fn duplicate_message(label: &str, part_number: &str, parent_label: &str) -> String {
    format!(
        "Failed to import BOM item {} because item with part number {} and parent {} already exists.",
        label, part_number, parent_label
    )
}

/// Resolve parts, create the missing ones, then create the missing BOM items
pub fn import_bom(
    client: &ApiClient,
    top_part_number: &str,
    layout: BomLayout,
    rows: &[BomRow],
) -> Result<ImportStats, ApiError> {
    let mut stats = ImportStats::new(rows.len(), 0);
    let mut cache = ResolutionCache::new();
    let (edges, part_numbers) = plan_edges(top_part_number, layout, rows);

    // Parts
    let lookup = Lookup::new(Query::Parts, "partNumber")
        .values(part_numbers.iter().map(String::as_str))
        .latest_revision();
    lookup_existing(client, &mut cache, &lookup)?;

    let first_row: HashMap<&str, &BomRow> =
        rows.iter().rev().map(|r| (r.part_number.as_str(), r)).collect();
    let part_batch: Vec<PendingMutation> = part_numbers
        .iter()
        .filter(|pn| {
            let exists = cache.contains(EntityKind::Part, pn);
            if exists {
                stats.existing += 1;
            }
            !exists
        })
        .map(|pn| {
            let input = first_row
                .get(pn.as_str())
                .map(|row| row.part_input())
                .unwrap_or_else(|| PartInput::new(pn.as_str()));
            PendingMutation::create_input(Mutation::CreatePart, &input, format!("'{}'", pn))
        })
        .collect::<Result<_, _>>()?;
    stats.report.absorb(run_batch(client, &mut cache, &part_batch)?);

    // Edges whose both ends now have an id
    let mut resolved = Vec::new();
    for edge in &edges {
        match (
            cache.id(EntityKind::Part, &edge.part_number),
            cache.id(EntityKind::Part, &edge.parent_part_number),
        ) {
            (Some(part_id), Some(parent_id)) => resolved.push((edge, part_id, parent_id)),
            _ => {
                debug!(item = %edge.label, "part or parent has no id, skipping BOM item");
                stats.skipped += 1;
            }
        }
    }

    // Existing BOM items under the involved parents
    let lookup = Lookup::new(Query::MbomItems, "parentId")
        .values(resolved.iter().map(|(_, _, parent_id)| parent_id.clone()));
    lookup_existing(client, &mut cache, &lookup)?;

    let mut labels: HashMap<String, (&str, &str)> = HashMap::new();
    let mut queued = HashSet::new();
    let mut item_batch = Vec::new();
    for (edge, part_id, parent_id) in resolved {
        let (Some(part_key), Some(parent_key)) = (value_key(&part_id), value_key(&parent_id)) else {
            continue;
        };
        let key = pair_key(&part_key, &parent_key);
        if cache.contains(EntityKind::MbomItem, &key) {
            stats.existing += 1;
            continue;
        }
        if !queued.insert(key) {
            warn!(
                "{}",
                duplicate_message(&edge.label, &edge.part_number, &edge.parent_label)
            );
            stats.skipped += 1;
            continue;
        }
        labels.insert(
            edge.label.clone(),
            (edge.part_number.as_str(), edge.parent_label.as_str()),
        );
        let input = MbomItemInput {
            part_id,
            parent_id,
            quantity: edge.quantity,
        };
        item_batch.push(PendingMutation::create_input(
            Mutation::CreateMbomItem,
            &input,
            edge.label.clone(),
        )?);
    }

    let report = run_batch_with(client, &mut cache, &item_batch, |pending, kind, _| {
        if kind != FailureKind::Uniqueness {
            return None;
        }
        labels
            .get(&pending.subject)
            .map(|(pn, parent)| duplicate_message(&pending.subject, pn, parent))
    })?;
    stats.report.absorb(report);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::{connection, ScriptedTransport};
    use serde_json::{json, Value};
    use std::path::Path;

    fn rows(content: &str, layout: BomLayout) -> Vec<BomRow> {
        let table = Table::from_csv_reader(Path::new("TOP.csv"), content.as_bytes()).unwrap();
        table
            .records()
            .map(|r| BomRow::from_record(&r, layout).unwrap())
            .collect()
    }

    fn created_part(id: i64, pn: &str) -> Value {
        json!({"data": {"createPart": {"part": {"id": id, "partNumber": pn}}}})
    }

    fn created_item(id: i64, part: i64, parent: i64) -> Value {
        json!({"data": {"createMbomItem": {"mbomItem": {"id": id, "partId": part, "parentId": parent}}}})
    }

    fn batch_inputs(body: &Value) -> Vec<Value> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|op| op["variables"]["input"].clone())
            .collect()
    }

    const LEVELS: &str = "Level,Part Number,Qty\n1,A,1\n1.1,B,2\n";

    #[test]
    fn test_top_level_part_number_from_file_name() {
        assert_eq!(
            top_level_part_number(Path::new("/tmp/exports/TOP-ASSY.xlsx")).unwrap(),
            "TOP-ASSY"
        );
        assert_eq!(top_level_part_number(Path::new("TOP.SLDASM.csv")).unwrap(), "TOP");
    }

    #[test]
    fn test_new_bom_creates_parts_then_items() {
        let transport = ScriptedTransport::new();
        transport
            .reply(connection("parts", vec![]))
            .reply(json!([created_part(1, "TOP"), created_part(2, "A"), created_part(3, "B")]))
            .reply(connection("mbomItems", vec![]))
            .reply(json!([created_item(10, 2, 1), created_item(11, 3, 2)]));

        let stats = import_bom(
            &transport.client(),
            "TOP",
            BomLayout::Level,
            &rows(LEVELS, BomLayout::Level),
        )
        .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0]["variables"]["filters"]["partNumber"]["in"], json!(["TOP", "A", "B"]));
        assert_eq!(
            batch_inputs(&sent[1]),
            vec![
                json!({"partNumber": "TOP"}),
                json!({"partNumber": "A"}),
                json!({"partNumber": "B"})
            ]
        );
        assert_eq!(sent[2]["variables"]["filters"]["parentId"]["in"], json!([1, 2]));
        assert_eq!(
            batch_inputs(&sent[3]),
            vec![
                json!({"partId": 2, "parentId": 1, "quantity": 1.0}),
                json!({"partId": 3, "parentId": 2, "quantity": 2.0})
            ]
        );
        assert_eq!(stats.created(), 5);
        assert_eq!(stats.errors(), 0);
    }

    #[test]
    fn test_existing_parts_are_not_created_again() {
        let transport = ScriptedTransport::new();
        transport
            .reply(connection(
                "parts",
                vec![json!({"id": 1, "partNumber": "TOP"}), json!({"id": 2, "partNumber": "A"})],
            ))
            .reply(json!([created_part(3, "B")]))
            .reply(connection("mbomItems", vec![]))
            .reply(json!([created_item(10, 2, 1), created_item(11, 3, 2)]));

        import_bom(
            &transport.client(),
            "TOP",
            BomLayout::Level,
            &rows(LEVELS, BomLayout::Level),
        )
        .unwrap();

        let created: Vec<Value> = batch_inputs(&transport.sent()[1]);
        assert_eq!(created, vec![json!({"partNumber": "B"})]);
    }

    #[test]
    fn test_rerun_against_existing_state_creates_nothing() {
        let transport = ScriptedTransport::new();
        transport
            .reply(connection(
                "parts",
                vec![
                    json!({"id": 1, "partNumber": "TOP"}),
                    json!({"id": 2, "partNumber": "A"}),
                    json!({"id": 3, "partNumber": "B"}),
                ],
            ))
            .reply(connection(
                "mbomItems",
                vec![
                    json!({"id": 10, "partId": 2, "parentId": 1}),
                    json!({"id": 11, "partId": 3, "parentId": 2}),
                ],
            ));

        let stats = import_bom(
            &transport.client(),
            "TOP",
            BomLayout::Level,
            &rows(LEVELS, BomLayout::Level),
        )
        .unwrap();

        assert_eq!(transport.mutations_sent(), 0);
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(stats.created(), 0);
        assert_eq!(stats.errors(), 0);
        assert_eq!(stats.existing, 5);
    }

    #[test]
    fn test_duplicate_item_uses_bom_message() {
        let transport = ScriptedTransport::new();
        transport
            .reply(connection(
                "parts",
                vec![
                    json!({"id": 1, "partNumber": "TOP"}),
                    json!({"id": 2, "partNumber": "A"}),
                    json!({"id": 3, "partNumber": "B"}),
                ],
            ))
            .reply(connection("mbomItems", vec![]))
            .reply(json!([
                created_item(10, 2, 1),
                {"errors": [{"message": "mbom item is not unique"}]}
            ]));

        let stats = import_bom(
            &transport.client(),
            "TOP",
            BomLayout::Level,
            &rows(LEVELS, BomLayout::Level),
        )
        .unwrap();

        assert_eq!(stats.errors(), 1);
        assert_eq!(
            stats.report.failures[0].message,
            "Failed to import BOM item 1.1 because item with part number B and parent 1 already exists."
        );
    }

    #[test]
    fn test_depth_layout_has_no_synthetic_top() {
        let transport = ScriptedTransport::new();
        transport
            .reply(connection(
                "parts",
                vec![
                    json!({"id": 1, "partNumber": "ROOT"}),
                    json!({"id": 2, "partNumber": "A"}),
                ],
            ))
            .reply(connection("mbomItems", vec![]))
            .reply(json!([created_item(10, 2, 1)]));

        let depth_rows = rows("Depth,Part Number,Qty\n0,ROOT,1\n1,A,4\n", BomLayout::Depth);
        let stats = import_bom(&transport.client(), "TOP", BomLayout::Depth, &depth_rows).unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0]["variables"]["filters"]["partNumber"]["in"], json!(["ROOT", "A"]));
        assert_eq!(
            batch_inputs(&sent[2]),
            vec![json!({"partId": 2, "parentId": 1, "quantity": 4.0})]
        );
        assert_eq!(stats.created(), 1);
    }

    #[test]
    fn test_edge_with_unresolved_part_is_skipped() {
        let transport = ScriptedTransport::new();
        transport
            .reply(connection(
                "parts",
                vec![json!({"id": 1, "partNumber": "TOP"}), json!({"id": 2, "partNumber": "A"})],
            ))
            .reply(json!([{"errors": [{"message": "partNumber is invalid"}]}]))
            .reply(connection("mbomItems", vec![]))
            .reply(json!([created_item(10, 2, 1)]));

        let stats = import_bom(
            &transport.client(),
            "TOP",
            BomLayout::Level,
            &rows(LEVELS, BomLayout::Level),
        )
        .unwrap();

        assert_eq!(batch_inputs(&transport.sent()[3]).len(), 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errors(), 1);
    }
}
