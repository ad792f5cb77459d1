//! Bulk mutation runner
//!
//! Sends one batch of create mutations, files every returned record in the
//! resolution cache and turns per-item failures into warnings. A failed item
//! never stops the rest of the batch.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::core::cache::ResolutionCache;
use crate::core::client::{ApiClient, ApiError};
use crate::core::graphql::{GraphqlRequest, GraphqlResponse, Mutation};
use crate::core::kind::EntityKind;

/// One create operation waiting to be sent
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub mutation: Mutation,
    pub variables: Value,
    /// Human description of the record, used in warnings
    pub subject: String,
}

impl PendingMutation {
    /// A mutation taking an `input` object
    pub fn create(mutation: Mutation, input: Value, subject: impl Into<String>) -> Self {
        Self {
            mutation,
            variables: serde_json::json!({ "input": input }),
            subject: subject.into(),
        }
    }

    /// A mutation taking a typed `input` object
    pub fn create_input<T: Serialize>(
        mutation: Mutation,
        input: &T,
        subject: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let input = serde_json::to_value(input).map_err(|e| ApiError::Encode(e.to_string()))?;
        Ok(Self::create(mutation, input, subject))
    }

    /// A mutation with its own variable layout
    pub fn with_variables(mutation: Mutation, variables: Value, subject: impl Into<String>) -> Self {
        Self {
            mutation,
            variables,
            subject: subject.into(),
        }
    }

    fn request(&self) -> GraphqlRequest {
        GraphqlRequest {
            query: self.mutation.document(),
            variables: self.variables.clone(),
        }
    }
}

/// Broad class of a per-item failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The record already exists
    Uniqueness,
    /// A referenced record is missing or invalid
    ForeignKey,
    /// Anything else the API rejected
    Validation,
}

impl FailureKind {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("not unique")
            || lower.contains("already exists")
            || lower.contains("unique constraint")
            || lower.contains("duplicate")
        {
            FailureKind::Uniqueness
        } else if lower.contains("foreign key")
            || lower.contains("does not exist")
            || lower.contains("not found")
            || lower.contains("invalid id")
        {
            FailureKind::ForeignKey
        } else {
            FailureKind::Validation
        }
    }
}

/// A per-item failure reported by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Position of the item in the batch
    pub index: usize,
    pub mutation: Mutation,
    pub kind: FailureKind,
    /// Warning text as logged
    pub message: String,
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct MutationReport {
    /// Successful operations per mutation
    pub completed: BTreeMap<Mutation, usize>,
    /// Records filed in the cache per kind
    pub recorded: BTreeMap<EntityKind, usize>,
    pub failures: Vec<ItemFailure>,
}

impl MutationReport {
    pub fn succeeded(&self) -> usize {
        self.completed.values().sum()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Fold another report into this one
    pub fn absorb(&mut self, other: MutationReport) {
        for (mutation, count) in other.completed {
            *self.completed.entry(mutation).or_default() += count;
        }
        for (kind, count) in other.recorded {
            *self.recorded.entry(kind).or_default() += count;
        }
        self.failures.extend(other.failures);
    }
}

/// Rewrite an API error message into an entity-specific warning
pub fn describe_failure(pending: &PendingMutation, message: &str) -> (FailureKind, String) {
    let kind = FailureKind::classify(message);
    let label = pending.mutation.kind().label();
    let text = match kind {
        FailureKind::Uniqueness => format!(
            "Failed to create {} {} because it already exists.",
            label, pending.subject
        ),
        FailureKind::ForeignKey => format!(
            "Failed to create {} {} because it references a missing record: {}",
            label, pending.subject, message
        ),
        FailureKind::Validation => {
            format!("Failed to create {} {}: {}", label, pending.subject, message)
        }
    };
    (kind, text)
}

/// Send a batch and file the results.
///
/// `describe` may replace the default warning text for a failed item; it is
/// given the pending mutation, the failure class and the raw API message.
pub fn run_batch_with<F>(
    client: &ApiClient,
    cache: &mut ResolutionCache,
    batch: &[PendingMutation],
    describe: F,
) -> Result<MutationReport, ApiError>
where
    F: Fn(&PendingMutation, FailureKind, &str) -> Option<String>,
{
    let mut report = MutationReport::default();
    if batch.is_empty() {
        return Ok(report);
    }

    let requests: Vec<GraphqlRequest> = batch.iter().map(PendingMutation::request).collect();
    let responses = client.batch(&requests)?;

    for (index, (pending, response)) in batch.iter().zip(responses).enumerate() {
        if let Some(message) = response.first_error() {
            let (kind, default_text) = describe_failure(pending, message);
            let text = describe(pending, kind, message).unwrap_or(default_text);
            warn!("{}", text);
            report.failures.push(ItemFailure {
                index,
                mutation: pending.mutation,
                kind,
                message: text,
            });
            continue;
        }

        record_response(cache, &response, &mut report);
        *report.completed.entry(pending.mutation).or_default() += 1;
    }

    for (mutation, count) in &report.completed {
        info!("Ran {} mutation {} times.", mutation.name(), count);
    }
    Ok(report)
}

/// Send a batch with the default warning text
pub fn run_batch(
    client: &ApiClient,
    cache: &mut ResolutionCache,
    batch: &[PendingMutation],
) -> Result<MutationReport, ApiError> {
    run_batch_with(client, cache, batch, |_, _, _| None)
}

/// File every record found under a mutation payload.
///
/// `data.<operation>.<field>` is either a single object (`create*`) or a list
/// (`bulkPartUpload`); the field name decides the kind.
fn record_response(cache: &mut ResolutionCache, response: &GraphqlResponse, report: &mut MutationReport) {
    let Some(Value::Object(data)) = &response.data else {
        return;
    };
    for payload in data.values() {
        let Value::Object(fields) = payload else {
            continue;
        };
        for (field, value) in fields {
            let Some(kind) = EntityKind::from_response_field(field) else {
                continue;
            };
            let objects: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(_) => vec![value],
                _ => Vec::new(),
            };
            for object in objects {
                if cache.record(kind, object.clone()).is_some() {
                    *report.recorded.entry(kind).or_default() += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::ScriptedTransport;
    use serde_json::json;

    fn part(pn: &str) -> PendingMutation {
        PendingMutation::create(Mutation::CreatePart, json!({"partNumber": pn}), pn)
    }

    #[test]
    fn test_create_input_wraps_typed_payload() {
        let input = crate::entities::PartInput::new("P-1");
        let pending = PendingMutation::create_input(Mutation::CreatePart, &input, "'P-1'").unwrap();
        assert_eq!(pending.variables["input"]["partNumber"], "P-1");

        // Maps keyed by tuples have no JSON form
        let unencodable: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into();
        let err = PendingMutation::create_input(Mutation::CreatePart, &unencodable, "x").unwrap_err();
        assert!(matches!(err, ApiError::Encode(_)));
    }

    #[test]
    fn test_middle_failure_keeps_other_results() {
        let transport = ScriptedTransport::new();
        transport.reply(json!([
            {"data": {"createPart": {"part": {"id": 1, "partNumber": "A"}}}},
            {"data": null, "errors": [{"message": "partNumber is not unique"}]},
            {"data": {"createPart": {"part": {"id": 3, "partNumber": "C"}}}}
        ]));
        let mut cache = ResolutionCache::new();

        let report =
            run_batch(&transport.client(), &mut cache, &[part("A"), part("B"), part("C")]).unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].kind, FailureKind::Uniqueness);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(cache.id(EntityKind::Part, "A"), Some(json!(1)));
        assert_eq!(cache.id(EntityKind::Part, "C"), Some(json!(3)));
        assert!(!cache.contains(EntityKind::Part, "B"));
    }

    #[test]
    fn test_bulk_upload_lists_are_filed_by_field() {
        let transport = ScriptedTransport::new();
        transport.reply(json!([{
            "data": {"bulkPartUpload": {
                "parts": [{"id": 1, "partNumber": "A"}, {"id": 2, "partNumber": "B"}],
                "locations": [{"id": 5, "name": "Shelf"}],
                "unitsOfMeasurements": [{"id": 9, "type": "each"}],
                "partsLots": [{"id": 7, "lotNumber": "L1", "originPartId": 1}]
            }}
        }]));
        let mut cache = ResolutionCache::new();
        let batch = vec![PendingMutation::create(
            Mutation::BulkPartUpload,
            json!({}),
            "bulk upload",
        )];

        let report = run_batch(&transport.client(), &mut cache, &batch).unwrap();

        assert_eq!(report.recorded[&EntityKind::Part], 2);
        assert_eq!(cache.id(EntityKind::Location, "Shelf"), Some(json!(5)));
        assert_eq!(cache.id(EntityKind::UnitOfMeasure, "each"), Some(json!(9)));
        assert_eq!(cache.id(EntityKind::PartLot, "1|L1"), Some(json!(7)));
    }

    #[test]
    fn test_custom_description_overrides_default() {
        let transport = ScriptedTransport::new();
        transport.reply(json!([{"errors": [{"message": "not unique"}]}]));
        let mut cache = ResolutionCache::new();

        let report = run_batch_with(&transport.client(), &mut cache, &[part("A")], |p, kind, _| {
            (kind == FailureKind::Uniqueness).then(|| format!("custom {}", p.subject))
        })
        .unwrap();

        assert_eq!(report.failures[0].message, "custom A");
    }

    #[test]
    fn test_empty_batch_makes_no_call() {
        let transport = ScriptedTransport::new();
        let mut cache = ResolutionCache::new();
        let report = run_batch(&transport.client(), &mut cache, &[]).unwrap();
        assert_eq!(report.succeeded(), 0);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            FailureKind::classify("duplicate key value violates unique constraint"),
            FailureKind::Uniqueness
        );
        assert_eq!(
            FailureKind::classify("Location with id 4 does not exist"),
            FailureKind::ForeignKey
        );
        assert_eq!(
            FailureKind::classify("quantity must be positive"),
            FailureKind::Validation
        );
    }

    #[test]
    fn test_describe_failure_names_the_entity() {
        let pending = PendingMutation::create(
            Mutation::CreateLocation,
            json!({"name": "Bin"}),
            "'Bin'",
        );
        let (_, text) = describe_failure(&pending, "name is not unique");
        assert_eq!(text, "Failed to create location 'Bin' because it already exists.");
    }

    #[test]
    fn test_reports_absorb() {
        let mut a = MutationReport::default();
        a.completed.insert(Mutation::CreatePart, 2);
        let mut b = MutationReport::default();
        b.completed.insert(Mutation::CreatePart, 1);
        b.completed.insert(Mutation::CreateLocation, 1);
        a.absorb(b);
        assert_eq!(a.completed[&Mutation::CreatePart], 3);
        assert_eq!(a.succeeded(), 4);
    }
}
