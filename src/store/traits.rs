//! Store adapter trait definitions
//!
//! The coordinator and federator issue abstract operations against these two
//! traits; translating them to a backing store's native query language is
//! entirely the adapter's concern. Both traits model blocking network I/O,
//! so every method is async and implementations must be safe for concurrent
//! invocation (`Send + Sync`).

use crate::model::{EntityDocument, EntityId, EntityKind, EntityPayload, Relationship, RelationshipKind};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during store adapter operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict: expected {expected}, store has {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("date parsing error: {0}")]
    DateParse(String),
}

/// Result type for store adapter operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A single predicate over a document payload field
///
/// Filters address top-level payload fields by name and evaluate against
/// the payload's JSON form. `Gte`/`Lte` compare numbers numerically and
/// strings lexicographically (which orders RFC 3339 dates correctly).
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
}

/// Supported field predicates
#[derive(Debug, Clone)]
pub enum FilterOp {
    Eq(serde_json::Value),
    /// Case-insensitive substring match
    Contains(String),
    Gte(serde_json::Value),
    Lte(serde_json::Value),
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::Eq(value.into()) }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self { field: field.into(), op: FilterOp::Contains(needle.into()) }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::Gte(value.into()) }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::Lte(value.into()) }
    }

    /// Evaluate this filter against a payload's JSON form
    pub fn matches_json(&self, payload: &serde_json::Value) -> bool {
        let Some(value) = payload.get(&self.field) else {
            return false;
        };
        match &self.op {
            FilterOp::Eq(expected) => value == expected,
            FilterOp::Contains(needle) => value
                .as_str()
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            FilterOp::Gte(bound) => compare(value, bound).map(|o| o.is_ge()).unwrap_or(false),
            FilterOp::Lte(bound) => compare(value, bound).map(|o| o.is_le()).unwrap_or(false),
        }
    }

    /// Evaluate this filter against a payload
    pub fn matches(&self, payload: &EntityPayload) -> StoreResult<bool> {
        let json = serde_json::to_value(payload)?;
        Ok(self.matches_json(&json))
    }
}

fn compare(value: &serde_json::Value, bound: &serde_json::Value) -> Option<std::cmp::Ordering> {
    match (value, bound) {
        (serde_json::Value::String(a), serde_json::Value::String(b)) => Some(a.as_str().cmp(b)),
        (serde_json::Value::Number(a), serde_json::Value::Number(b)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        _ => None,
    }
}

/// Evaluate a conjunction of filters against a payload's JSON form
pub fn payload_matches_all(payload: &serde_json::Value, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|f| f.matches_json(payload))
}

/// A traversal constraint over relationship edges
///
/// Any combination of fields may be pinned; an unset field matches
/// anything. Traversal yields the entities on the unpinned end(s) of
/// matching edges.
#[derive(Debug, Clone, Default)]
pub struct GraphConstraint {
    pub kind: Option<RelationshipKind>,
    pub source: Option<EntityId>,
    pub target: Option<EntityId>,
}

impl GraphConstraint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<RelationshipKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn from_source(mut self, source: impl Into<EntityId>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn to_target(mut self, target: impl Into<EntityId>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Whether an edge satisfies every pinned field
    pub fn matches(&self, edge: &Relationship) -> bool {
        if let Some(ref kind) = self.kind {
            if &edge.kind != kind {
                return false;
            }
        }
        if let Some(ref source) = self.source {
            if &edge.source != source {
                return false;
            }
        }
        if let Some(ref target) = self.target {
            if &edge.target != target {
                return false;
            }
        }
        true
    }

    /// The candidate entities a matching edge contributes: the endpoints
    /// not pinned by the constraint, or both endpoints when fully pinned.
    pub fn candidates_of<'a>(&self, edge: &'a Relationship) -> Vec<&'a EntityId> {
        match (&self.source, &self.target) {
            (Some(_), None) => vec![&edge.target],
            (None, Some(_)) => vec![&edge.source],
            _ => vec![&edge.source, &edge.target],
        }
    }
}

/// Store adapter for whole entity documents, keyed by identifier
///
/// Owns version assignment: versions start at 1 on create and increment by
/// one on every successful compare-and-set write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a document. `expected_version: None` creates the document at
    /// version 1 (`AlreadyExists` if present); `Some(v)` performs an
    /// optimistic write to version `v + 1` (`NotFound` if absent,
    /// `VersionConflict` if the stored version differs). Returns the new
    /// version.
    async fn put(
        &self,
        id: &EntityId,
        payload: &EntityPayload,
        expected_version: Option<u64>,
    ) -> StoreResult<u64>;

    /// Load a document by id
    async fn get(&self, id: &EntityId) -> StoreResult<Option<EntityDocument>>;

    /// Delete a document. Idempotent; returns whether it existed.
    async fn delete(&self, id: &EntityId) -> StoreResult<bool>;

    /// Find documents matching every filter, ordered by id ascending,
    /// with `limit`/`offset` applied after filtering
    async fn query_by_fields(
        &self,
        kind: Option<EntityKind>,
        filters: &[FieldFilter],
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<EntityDocument>>;
}

/// Store adapter for typed relationship edges
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create an edge. `AlreadyExists` if an edge with the same
    /// (source, target, kind) key is present.
    async fn create_edge(&self, edge: &Relationship) -> StoreResult<()>;

    /// Delete an edge. Idempotent; returns whether it existed.
    async fn delete_edge(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: &RelationshipKind,
    ) -> StoreResult<bool>;

    /// All edges with the given entity as either endpoint
    async fn edges_incident_to(&self, id: &EntityId) -> StoreResult<Vec<Relationship>>;

    /// Identifiers on the unpinned end(s) of edges matching the
    /// constraint, deduplicated, ascending
    async fn traverse(&self, constraint: &GraphConstraint) -> StoreResult<Vec<EntityId>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relationship;

    #[test]
    fn eq_filter_matches_top_level_field() {
        let json = serde_json::json!({"status": "active", "phase": "3"});
        assert!(FieldFilter::eq("status", "active").matches_json(&json));
        assert!(!FieldFilter::eq("status", "completed").matches_json(&json));
        assert!(!FieldFilter::eq("missing", "x").matches_json(&json));
    }

    #[test]
    fn contains_filter_is_case_insensitive() {
        let json = serde_json::json!({"sponsor": "Novo Nordisk"});
        assert!(FieldFilter::contains("sponsor", "novo").matches_json(&json));
        assert!(FieldFilter::contains("sponsor", "NORDISK").matches_json(&json));
        assert!(!FieldFilter::contains("sponsor", "pfizer").matches_json(&json));
    }

    #[test]
    fn range_filters_order_dates_lexicographically() {
        let json = serde_json::json!({"start_date": "2023-06-01T00:00:00Z"});
        assert!(FieldFilter::gte("start_date", "2023-01-01T00:00:00Z").matches_json(&json));
        assert!(FieldFilter::lte("start_date", "2024-01-01T00:00:00Z").matches_json(&json));
        assert!(!FieldFilter::gte("start_date", "2024-01-01T00:00:00Z").matches_json(&json));
    }

    #[test]
    fn constraint_matching_and_candidates() {
        let edge = Relationship::new("t1", "d1", "tests");

        let by_target = GraphConstraint::new().with_kind("tests").to_target("d1");
        assert!(by_target.matches(&edge));
        assert_eq!(by_target.candidates_of(&edge), vec![&"t1".into()]);

        let by_source = GraphConstraint::new().from_source("t1");
        assert_eq!(by_source.candidates_of(&edge), vec![&"d1".into()]);

        let by_kind = GraphConstraint::new().with_kind("tests");
        assert_eq!(by_kind.candidates_of(&edge).len(), 2);

        let wrong_kind = GraphConstraint::new().with_kind("produces");
        assert!(!wrong_kind.matches(&edge));
    }
}
