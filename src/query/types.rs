//! Federated query types and result structures

use crate::model::{EntityDocument, EntityKind, Relationship};
use crate::store::{FieldFilter, GraphConstraint};

/// Default page size when none is given
pub const DEFAULT_LIMIT: usize = 100;

/// A composite query over document fields and relationship edges
#[derive(Debug, Clone)]
pub struct FederatedQuery {
    /// Restrict to one entity kind
    pub kind: Option<EntityKind>,
    /// Conjunction of document field predicates
    pub filters: Vec<FieldFilter>,
    /// Relationship constraint; when set, graph traversal runs first
    pub graph: Option<GraphConstraint>,
    /// Maximum number of results
    pub limit: usize,
    /// Number of results to skip
    pub offset: usize,
}

impl Default for FederatedQuery {
    fn default() -> Self {
        Self {
            kind: None,
            filters: Vec::new(),
            graph: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl FederatedQuery {
    /// Create a new empty query (matches all entities)
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one entity kind
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add a document field predicate
    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Constrain results to entities satisfying a relationship constraint
    pub fn with_graph(mut self, constraint: GraphConstraint) -> Self {
        self.graph = Some(constraint);
        self
    }

    /// Limit results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Skip results (for pagination)
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// A query result entry: the full document plus the edges that satisfied
/// the graph constraint, so callers needing both shapes issue one read
#[derive(Debug, Clone)]
pub struct EnrichedEntity {
    pub document: EntityDocument,
    /// Edges satisfying the query's graph constraint; empty when the
    /// query had none
    pub edges: Vec<Relationship>,
}
