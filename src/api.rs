//! Transport-independent API layer
//!
//! `RepositoryApi` is the single entry point for consumer-facing
//! operations. Transports (REST, CLI, direct embedding) call these methods
//! and never reach into the coordinator, federator, or registry directly.
//! All inputs and outputs are plain data; errors are the taxonomy in
//! [`crate::error`].

use crate::coordinator::Coordinator;
use crate::error::TrialGraphResult;
use crate::model::{
    EntityDocument, EntityId, EntityKind, EntityPayload, Properties, Relationship,
    RelationshipKind,
};
use crate::query::{EnrichedEntity, FederatedQuery, QueryFederator};
use crate::registry::{DriftReport, EntityRegistry};
use crate::store::{DocumentStore, FieldFilter, GraphConstraint, GraphStore};
use std::sync::Arc;

/// Per-store reachability, as reported by `health`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub documents_ok: bool,
    pub graph_ok: bool,
}

impl HealthStatus {
    pub fn healthy(&self) -> bool {
        self.documents_ok && self.graph_ok
    }
}

/// Single entry point for all consumer-facing operations
#[derive(Clone)]
pub struct RepositoryApi {
    documents: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphStore>,
    coordinator: Arc<Coordinator>,
    federator: Arc<QueryFederator>,
    registry: Arc<EntityRegistry>,
}

impl RepositoryApi {
    /// Build the coordination layer over a pair of store adapters
    pub fn new(documents: Arc<dyn DocumentStore>, graph: Arc<dyn GraphStore>) -> Self {
        let registry = Arc::new(EntityRegistry::new());
        let coordinator = Arc::new(Coordinator::new(
            documents.clone(),
            graph.clone(),
            registry.clone(),
        ));
        let federator = Arc::new(QueryFederator::new(documents.clone(), graph.clone()));
        Self { documents, graph, coordinator, federator, registry }
    }

    // --- Writes ---

    /// Create an entity with a generated identifier
    pub async fn create_entity(&self, payload: EntityPayload) -> TrialGraphResult<(EntityId, u64)> {
        self.coordinator.create_entity(payload).await
    }

    /// Create an entity with a caller-supplied identifier
    pub async fn create_entity_with_id(
        &self,
        id: EntityId,
        payload: EntityPayload,
    ) -> TrialGraphResult<(EntityId, u64)> {
        self.coordinator.create_entity_with_id(id, payload).await
    }

    /// Update an entity under optimistic concurrency
    pub async fn update_entity(
        &self,
        id: &EntityId,
        expected_version: u64,
        payload: EntityPayload,
    ) -> TrialGraphResult<u64> {
        self.coordinator.update_entity(id, expected_version, payload).await
    }

    /// Delete an entity, cascading into its incident edges
    pub async fn delete_entity(&self, id: &EntityId) -> TrialGraphResult<()> {
        self.coordinator.delete_entity(id).await
    }

    /// Create a relationship edge between two existing entities
    pub async fn link_entities(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: impl Into<RelationshipKind>,
        attributes: Properties,
    ) -> TrialGraphResult<Relationship> {
        self.coordinator.link_entities(source, target, kind, attributes).await
    }

    /// Remove a relationship edge; a no-op if it does not exist
    pub async fn unlink_entities(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: impl Into<RelationshipKind>,
    ) -> TrialGraphResult<()> {
        self.coordinator.unlink_entities(source, target, kind).await
    }

    // --- Reads ---

    /// Read an entity document
    pub async fn get_entity(&self, id: &EntityId) -> TrialGraphResult<EntityDocument> {
        self.coordinator.get_entity(id).await
    }

    /// List the edges incident to an entity
    pub async fn edges_of(&self, id: &EntityId) -> TrialGraphResult<Vec<Relationship>> {
        Ok(self.graph.edges_incident_to(id).await?)
    }

    /// Execute a federated query
    pub async fn query(&self, query: &FederatedQuery) -> TrialGraphResult<Vec<EnrichedEntity>> {
        self.federator.query(query).await
    }

    /// Trials connected by a "tests" edge to any drug whose name contains
    /// `name` (case-insensitive)
    ///
    /// Two-step federation: resolve the matching drug compounds
    /// document-side, then run the base query once per drug with the edge
    /// kind pinned to `tests`. The base query's `limit`/`offset` apply once,
    /// to the merged and deduplicated result set.
    pub async fn trials_testing_drug(
        &self,
        name: &str,
        base: FederatedQuery,
    ) -> TrialGraphResult<Vec<EnrichedEntity>> {
        let drugs = self
            .query(
                &FederatedQuery::new()
                    .with_kind(EntityKind::DrugCompound)
                    .with_filter(FieldFilter::contains("name", name))
                    .limit(usize::MAX),
            )
            .await?;

        let mut merged = Vec::new();
        for drug in &drugs {
            let per_drug = base
                .clone()
                .with_graph(
                    GraphConstraint::new()
                        .with_kind(RelationshipKind::Tests)
                        .to_target(drug.document.id.clone()),
                )
                .limit(usize::MAX)
                .offset(0);
            merged.append(&mut self.query(&per_drug).await?);
        }
        merged.sort_by(|a, b| a.document.id.cmp(&b.document.id));
        merged.dedup_by(|a, b| a.document.id == b.document.id);
        Ok(merged
            .into_iter()
            .skip(base.offset)
            .take(base.limit)
            .collect())
    }

    // --- Reconciliation ---

    /// Re-read both stores for one entity and report drift
    pub async fn reconcile(&self, id: &EntityId) -> TrialGraphResult<DriftReport> {
        Ok(self
            .registry
            .reconcile(id, self.documents.as_ref(), self.graph.as_ref())
            .await?)
    }

    /// Reconcile every identifier the registry knows about
    ///
    /// The background sweep's entry point. The registry is advisory, so
    /// entities it never saw are simply not visited here; they are picked
    /// up once any operation (or a direct `reconcile`) touches them.
    pub async fn reconcile_all(&self) -> TrialGraphResult<Vec<DriftReport>> {
        let mut reports = Vec::new();
        for id in self.registry.known_ids() {
            reports.push(self.reconcile(&id).await?);
        }
        Ok(reports)
    }

    /// Delete the dangling edges a drift report found
    pub async fn repair_drift(&self, report: &DriftReport) -> TrialGraphResult<usize> {
        self.coordinator.repair_drift(report).await
    }

    /// Probe both stores with a cheap read
    pub async fn health(&self) -> HealthStatus {
        let probe = EntityId::from("health-probe");
        HealthStatus {
            documents_ok: self.documents.get(&probe).await.is_ok(),
            graph_ok: self.graph.edges_incident_to(&probe).await.is_ok(),
        }
    }
}
