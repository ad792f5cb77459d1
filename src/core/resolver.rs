//! Existing-record resolution
//!
//! Before anything is created, candidates are looked up by natural key with a
//! single `in`-filtered query. Every match is filed in the
//! [`ResolutionCache`]; callers then keep only the candidates whose key is
//! still unresolved.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::core::cache::ResolutionCache;
use crate::core::client::{ApiClient, ApiError};
use crate::core::graphql::{GraphqlRequest, Query};
use crate::core::kind::EntityKind;

/// One existing-record lookup
#[derive(Debug, Clone)]
pub struct Lookup {
    pub query: Query,
    /// Field the `in` filter applies to
    pub field: &'static str,
    /// Filter values, deduplicated and in first-seen order
    pub values: Vec<Value>,
    /// Additional filters, e.g. `isLatestRevision`
    pub extra: Map<String, Value>,
}

impl Lookup {
    pub fn new(query: Query, field: &'static str) -> Self {
        Self {
            query,
            field,
            values: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Add filter values, skipping duplicates and nulls
    pub fn values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut seen: BTreeSet<String> = self.values.iter().map(Value::to_string).collect();
        for value in values {
            let value = value.into();
            if value.is_null() {
                continue;
            }
            if seen.insert(value.to_string()) {
                self.values.push(value);
            }
        }
        self
    }

    pub fn filter(mut self, field: &str, condition: Value) -> Self {
        self.extra.insert(field.to_string(), condition);
        self
    }

    /// Only latest revisions of parts
    pub fn latest_revision(self) -> Self {
        self.filter("isLatestRevision", serde_json::json!({ "eq": true }))
    }
}

/// Run a lookup and file every returned node in the cache.
///
/// Returns the nodes themselves for callers that need more than the natural
/// key. An empty value list short-circuits without an API call.
pub fn lookup_existing(
    client: &ApiClient,
    cache: &mut ResolutionCache,
    lookup: &Lookup,
) -> Result<Vec<Value>, ApiError> {
    let kind = lookup.query.kind();
    if lookup.values.is_empty() {
        return Ok(Vec::new());
    }

    let request =
        GraphqlRequest::filter_in(lookup.query, lookup.field, &lookup.values, lookup.extra.clone());
    let response = client.request(&request)?;
    if let Some(message) = response.first_error() {
        return Err(ApiError::Query(message.to_string()));
    }

    let nodes = response.nodes();
    for node in &nodes {
        if cache.record(kind, node.clone()).is_none() {
            debug!(%kind, "lookup returned a node without its natural key");
        }
    }
    info!(
        "Found {} existing {} record(s) out of {} candidate(s)",
        nodes.len(),
        kind,
        lookup.values.len()
    );
    Ok(nodes)
}

/// Keep the candidates whose natural key is not yet in the cache.
///
/// Builds a new collection; input order is preserved.
pub fn retain_unresolved<T>(
    cache: &ResolutionCache,
    kind: EntityKind,
    candidates: Vec<T>,
    key: impl Fn(&T) -> String,
) -> Vec<T> {
    candidates
        .into_iter()
        .filter(|candidate| !cache.contains(kind, &key(candidate)))
        .collect()
}
