//! Query federation: planning and merging across the two stores
//!
//! Planning rule: a relationship constraint is typically far more selective
//! than a document filter, so when one is present the graph store runs
//! first and document filters apply only to the candidate set via direct
//! lookups. Scanning the whole document store per query is never an option.

use super::types::{EnrichedEntity, FederatedQuery};
use crate::error::TrialGraphResult;
use crate::model::{EntityDocument, EntityId, Relationship};
use crate::store::{payload_matches_all, DocumentStore, GraphConstraint, GraphStore, StoreError};
use std::sync::Arc;
use tracing::warn;

/// Answers composite queries by consulting both store adapters and merging
pub struct QueryFederator {
    documents: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphStore>,
}

impl QueryFederator {
    pub fn new(documents: Arc<dyn DocumentStore>, graph: Arc<dyn GraphStore>) -> Self {
        Self { documents, graph }
    }

    /// Execute a federated query
    ///
    /// Results are ordered by entity id ascending before pagination, so
    /// repeated queries over unchanged data return consistent page
    /// boundaries.
    pub async fn query(&self, query: &FederatedQuery) -> TrialGraphResult<Vec<EnrichedEntity>> {
        let Some(constraint) = &query.graph else {
            // Document-only: delegate filtering and pagination to the store
            let docs = self
                .documents
                .query_by_fields(query.kind, &query.filters, query.limit, query.offset)
                .await?;
            return Ok(docs
                .into_iter()
                .map(|document| EnrichedEntity { document, edges: Vec::new() })
                .collect());
        };

        // Graph-first: traversal yields the candidate set, then each
        // candidate is hydrated by direct lookup.
        let candidates = self.graph.traverse(constraint).await?;

        let mut results = Vec::new();
        for id in candidates {
            let Some(document) = self.hydrate(&id).await? else {
                continue;
            };
            if let Some(kind) = query.kind {
                if document.kind != kind {
                    continue;
                }
            }
            if !query.filters.is_empty() {
                let json = serde_json::to_value(&document.payload).map_err(StoreError::from)?;
                if !payload_matches_all(&json, &query.filters) {
                    continue;
                }
            }
            let edges = self.matching_edges(&id, constraint).await?;
            results.push(EnrichedEntity { document, edges });
        }

        // Traversal already yields ids ascending, but hydration can drop
        // entries; keep the ordering contract explicit.
        results.sort_by(|a, b| a.document.id.cmp(&b.document.id));
        Ok(results
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    /// Load a candidate's document; a missing document is a logged anomaly
    /// (a dangling edge pending reconciliation), not a query failure
    async fn hydrate(&self, id: &EntityId) -> TrialGraphResult<Option<EntityDocument>> {
        let doc = self.documents.get(id).await?;
        if doc.is_none() {
            warn!(entity = %id, "dropping candidate with no document (dangling edge?)");
        }
        Ok(doc)
    }

    /// The edges incident to an entity that satisfy the constraint
    async fn matching_edges(
        &self,
        id: &EntityId,
        constraint: &GraphConstraint,
    ) -> TrialGraphResult<Vec<Relationship>> {
        let edges = self.graph.edges_incident_to(id).await?;
        Ok(edges.into_iter().filter(|e| constraint.matches(e)).collect())
    }
}
