//! In-memory resolution cache for one import run
//!
//! Maps `(kind, natural key)` to the API object last seen for it. The cache
//! is filled by existing-record lookups and by create-mutation results, and
//! is dropped when the import finishes.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::core::kind::EntityKind;

#[derive(Debug, Default)]
pub struct ResolutionCache {
    sections: HashMap<EntityKind, HashMap<String, Value>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// File an API object under its natural key.
    ///
    /// Returns the key, or `None` when the object lacks the key fields.
    pub fn record(&mut self, kind: EntityKind, object: Value) -> Option<String> {
        let key = kind.natural_key(&object)?;
        self.sections
            .entry(kind)
            .or_default()
            .insert(key.clone(), object);
        Some(key)
    }

    pub fn contains(&self, kind: EntityKind, key: &str) -> bool {
        self.get(kind, key).is_some()
    }

    /// The cached object for a natural key
    pub fn get(&self, kind: EntityKind, key: &str) -> Option<&Value> {
        self.sections.get(&kind).and_then(|section| section.get(key))
    }

    /// The API identifier for a natural key, as the JSON value the API used
    pub fn id(&self, kind: EntityKind, key: &str) -> Option<Value> {
        self.get(kind, key)
            .and_then(|object| object.get("id"))
            .filter(|id| !id.is_null())
            .cloned()
    }

    /// The API identifier rendered as a key component
    pub fn id_key(&self, kind: EntityKind, key: &str) -> Option<String> {
        self.get(kind, key)
            .and_then(|object| crate::core::kind::scalar(object, "id"))
    }

    /// Number of cached objects of a kind
    pub fn len(&self, kind: EntityKind) -> usize {
        self.sections.get(&kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(HashMap::is_empty)
    }

    /// Counts per kind, ordered for stable display
    pub fn summary(&self) -> BTreeMap<EntityKind, usize> {
        self.sections
            .iter()
            .filter(|(_, section)| !section.is_empty())
            .map(|(kind, section)| (*kind, section.len()))
            .collect()
    }
}
