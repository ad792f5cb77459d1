//! BOM hierarchy reconstruction from flat rows
//!
//! Two encodings are supported, both producing the same [`BomEdge`] list:
//!
//! - **Dot-notation levels** (`1`, `1.2`, `1.2.3`): the parent of a level is
//!   the level with its last segment removed. A level without a dot hangs off
//!   the synthetic top level [`TOP_LEVEL`], which stands for the assembly the
//!   export was made from.
//! - **Depth columns**: a stack holds the most recent part at every depth; a
//!   row's parent is the entry one level up. Rows at the top depth have no
//!   parent.

use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Level key of the top-level assembly in dot-notation exports
pub const TOP_LEVEL: &str = "0";

/// A row positioned by a dot-notation level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLine {
    pub level: String,
    pub part_number: String,
    pub quantity: f64,
}

/// A row positioned by an integer depth
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLine {
    /// Row label used in messages (usually the row number)
    pub label: String,
    pub depth: usize,
    pub part_number: String,
    pub quantity: f64,
}

/// A parent/child relation derived from the rows
#[derive(Debug, Clone, PartialEq)]
pub struct BomEdge {
    /// Where the edge came from: the level key or row label
    pub label: String,
    pub part_number: String,
    pub parent_part_number: String,
    /// Label of the parent position (level key or row label)
    pub parent_label: String,
    pub quantity: f64,
}

/// Parent key of a dot-notation level
pub fn parent_level(level: &str) -> &str {
    match level.rsplit_once('.') {
        Some((parent, _)) => parent,
        None => TOP_LEVEL,
    }
}

/// Build edges from dot-notation levels.
///
/// `top_part_number` is the part standing for [`TOP_LEVEL`]. Lines whose
/// parent level does not occur in the input are skipped.
pub fn edges_from_levels(top_part_number: &str, lines: &[LevelLine]) -> Vec<BomEdge> {
    let mut parts_by_level: HashMap<&str, &str> = HashMap::new();
    parts_by_level.insert(TOP_LEVEL, top_part_number);
    for line in lines {
        parts_by_level.insert(line.level.as_str(), line.part_number.as_str());
    }

    lines
        .iter()
        .filter_map(|line| {
            let parent = parent_level(&line.level);
            let Some(parent_part) = parts_by_level.get(parent) else {
                debug!(level = %line.level, parent, "parent level missing, skipping BOM line");
                return None;
            };
            Some(BomEdge {
                label: line.level.clone(),
                part_number: line.part_number.clone(),
                parent_part_number: parent_part.to_string(),
                parent_label: parent.to_string(),
                quantity: line.quantity,
            })
        })
        .collect()
}

/// A row placed more than one level below the deepest open entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("depth {depth} skips a level below depth {open}")]
pub struct DepthGap {
    pub depth: usize,
    /// Number of open levels when the row was placed
    pub open: usize,
}

/// Tracks the most recent part number at each depth
#[derive(Debug, Default)]
pub struct DepthStack {
    entries: Vec<(String, String)>,
}

impl DepthStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a part at `depth` (0 = top) and return the `(label, part)` it
    /// hangs from.
    ///
    /// Deeper entries are discarded, an entry at the same depth is replaced
    /// and a deeper row is pushed. A row more than one level below the
    /// current top cannot be placed and yields [`DepthGap`] without
    /// changing the stack.
    pub fn place(
        &mut self,
        depth: usize,
        label: &str,
        part_number: &str,
    ) -> Result<Option<(String, String)>, DepthGap> {
        if depth > self.entries.len() {
            return Err(DepthGap {
                depth,
                open: self.entries.len(),
            });
        }
        self.entries.truncate(depth);
        let parent = depth
            .checked_sub(1)
            .and_then(|d| self.entries.get(d))
            .cloned();
        self.entries
            .push((label.to_string(), part_number.to_string()));
        Ok(parent)
    }

    /// The part currently held at `depth`
    #[cfg(test)]
    fn at(&self, depth: usize) -> Option<&str> {
        self.entries.get(depth).map(|(_, part)| part.as_str())
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.entries.len()
    }
}

/// Build edges from depth-annotated rows.
///
/// Depths are taken relative to the shallowest row, which is the top of the
/// hierarchy. Rows that jump more than one level deeper than their
/// predecessor are skipped together with their subtree.
pub fn edges_from_depths(lines: &[DepthLine]) -> Vec<BomEdge> {
    let base = lines.iter().map(|l| l.depth).min().unwrap_or(0);
    let mut stack = DepthStack::new();
    let mut edges = Vec::new();

    for line in lines {
        match stack.place(line.depth - base, &line.label, &line.part_number) {
            Ok(Some((parent_label, parent_part))) => edges.push(BomEdge {
                label: line.label.clone(),
                part_number: line.part_number.clone(),
                parent_part_number: parent_part,
                parent_label,
                quantity: line.quantity,
            }),
            Ok(None) => {}
            Err(gap) => {
                debug!(row = %line.label, "{}, skipping BOM line", gap);
            }
        }
    }
    edges
}
