//! Consistency coordinator: multi-store write orchestration
//!
//! The coordinator decomposes logical writes into store-specific steps and
//! sequences them under one ordering rule: document writes precede graph
//! writes when creating, and graph deletes precede document deletes when
//! deleting. An edge therefore never references a document that has not yet
//! been written, and a document never disappears while edges still
//! reference it through this code path.
//!
//! Neither store can roll back the other, so multi-step operations never
//! undo committed steps. A failure partway through surfaces as
//! `PartialFailure` listing exactly what committed; the caller retries the
//! remaining steps (edge deletion is idempotent, so re-running
//! `delete_entity` is always safe). The coordinator never retries on its
//! own — only the caller knows whether re-issuing a create is safe.

use crate::error::{CommittedStep, PartialFailureReport, TrialGraphError, TrialGraphResult};
use crate::model::{
    EdgeKey, EntityDocument, EntityId, EntityPayload, Properties, Relationship, RelationshipKind,
};
use crate::registry::{DriftReport, EntityRegistry};
use crate::store::{DocumentStore, GraphStore, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates writes across the document and graph stores
pub struct Coordinator {
    documents: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphStore>,
    registry: Arc<EntityRegistry>,
}

impl Coordinator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        graph: Arc<dyn GraphStore>,
        registry: Arc<EntityRegistry>,
    ) -> Self {
        Self { documents, graph, registry }
    }

    /// Create an entity with a generated identifier
    pub async fn create_entity(
        &self,
        payload: EntityPayload,
    ) -> TrialGraphResult<(EntityId, u64)> {
        self.create_entity_with_id(EntityId::new(), payload).await
    }

    /// Create an entity with a caller-supplied identifier
    ///
    /// Single-store: only the document store is touched, so there is no
    /// partial state to report. An existing id is a validation error.
    pub async fn create_entity_with_id(
        &self,
        id: EntityId,
        payload: EntityPayload,
    ) -> TrialGraphResult<(EntityId, u64)> {
        payload.validate().map_err(TrialGraphError::Validation)?;

        let version = match self.documents.put(&id, &payload, None).await {
            Ok(v) => v,
            Err(StoreError::AlreadyExists(_)) => {
                return Err(TrialGraphError::Validation(format!(
                    "entity '{}' already exists",
                    id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.registry.observe_document(&id, version);
        info!(entity = %id, kind = %payload.kind(), "created entity");
        Ok((id, version))
    }

    /// Update an entity under optimistic concurrency
    ///
    /// Fails with `VersionConflict` when the store's current version is not
    /// `expected_version`; the caller re-reads and retries. The entity's
    /// kind is fixed at creation.
    pub async fn update_entity(
        &self,
        id: &EntityId,
        expected_version: u64,
        payload: EntityPayload,
    ) -> TrialGraphResult<u64> {
        payload.validate().map_err(TrialGraphError::Validation)?;

        let current = self
            .documents
            .get(id)
            .await?
            .ok_or_else(|| TrialGraphError::NotFound(id.clone()))?;
        if current.kind != payload.kind() {
            return Err(TrialGraphError::Validation(format!(
                "entity '{}' is a {}, not a {}",
                id,
                current.kind,
                payload.kind()
            )));
        }

        let version = self.documents.put(id, &payload, Some(expected_version)).await?;
        self.registry.observe_document(id, version);
        info!(entity = %id, version, "updated entity");
        Ok(version)
    }

    /// Delete an entity and all its incident edges
    ///
    /// Graph deletes run first so a query can never see an edge whose
    /// endpoint document is already gone. A failure after the first
    /// committed step reports `PartialFailure`; retrying the whole
    /// operation completes the remaining steps.
    pub async fn delete_entity(&self, id: &EntityId) -> TrialGraphResult<()> {
        if self.documents.get(id).await?.is_none() {
            return Err(TrialGraphError::NotFound(id.clone()));
        }

        let edges = self.graph.edges_incident_to(id).await?;

        let mut committed = Vec::new();
        for edge in &edges {
            let key = edge.key();
            match self
                .graph
                .delete_edge(&edge.source, &edge.target, &edge.kind)
                .await
            {
                Ok(_) => {
                    self.registry.observe_edge_gone(&key);
                    committed.push(CommittedStep::EdgeRemoved(key));
                }
                Err(e) => {
                    return Err(self.partial_failure(
                        "delete_entity",
                        id,
                        committed,
                        format!("delete_edge {}", key),
                        e,
                    ));
                }
            }
        }

        match self.documents.delete(id).await {
            // A concurrent delete getting there first still leaves the
            // entity gone, which is what the caller asked for.
            Ok(_) => {}
            Err(e) => {
                if committed.is_empty() {
                    return Err(e.into());
                }
                return Err(self.partial_failure(
                    "delete_entity",
                    id,
                    committed,
                    "delete_document".to_string(),
                    e,
                ));
            }
        }

        self.registry.observe_document_gone(id);
        info!(entity = %id, edges_removed = edges.len(), "deleted entity");
        Ok(())
    }

    /// Create a relationship edge between two existing entities
    ///
    /// Both endpoints are re-read from the document store; the registry is
    /// a hint only and is never trusted for this check. Known bounded
    /// anomaly: an endpoint deleted between this check and the edge write
    /// leaves a dangling edge until the reconciliation sweep removes it.
    pub async fn link_entities(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: impl Into<RelationshipKind>,
        attributes: Properties,
    ) -> TrialGraphResult<Relationship> {
        for endpoint in [source, target] {
            if self.documents.get(endpoint).await?.is_none() {
                return Err(TrialGraphError::DanglingReference(endpoint.clone()));
            }
        }

        let mut edge = Relationship::new(source.clone(), target.clone(), kind);
        edge.attributes = attributes;

        match self.graph.create_edge(&edge).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => {
                return Err(TrialGraphError::DuplicateRelationship(edge.key()));
            }
            Err(e) => return Err(e.into()),
        }

        self.registry.observe_edge(&edge.key());
        info!(edge = %edge.key(), "linked entities");
        Ok(edge)
    }

    /// Remove a relationship edge; a no-op if it does not exist
    pub async fn unlink_entities(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: impl Into<RelationshipKind>,
    ) -> TrialGraphResult<()> {
        let kind = kind.into();
        let existed = self.graph.delete_edge(source, target, &kind).await?;
        if existed {
            let key = EdgeKey {
                source: source.clone(),
                target: target.clone(),
                kind,
            };
            self.registry.observe_edge_gone(&key);
            info!(edge = %key, "unlinked entities");
        }
        Ok(())
    }

    /// Read an entity document
    pub async fn get_entity(&self, id: &EntityId) -> TrialGraphResult<EntityDocument> {
        self.documents
            .get(id)
            .await?
            .ok_or_else(|| TrialGraphError::NotFound(id.clone()))
    }

    /// Apply forward-only repair for a drift report: delete its dangling
    /// edges. Returns how many edges were removed. Document state is never
    /// touched — recreating documents from a cache would invert the
    /// authority relationship.
    pub async fn repair_drift(&self, report: &DriftReport) -> TrialGraphResult<usize> {
        let mut removed = 0;
        for edge in &report.dangling_edges {
            if self
                .graph
                .delete_edge(&edge.source, &edge.target, &edge.kind)
                .await?
            {
                removed += 1;
            }
            self.registry.observe_edge_gone(&edge.key());
            warn!(edge = %edge.key(), "removed dangling edge during repair");
        }
        Ok(removed)
    }

    fn partial_failure(
        &self,
        operation: &str,
        entity: &EntityId,
        committed: Vec<CommittedStep>,
        failed_step: String,
        cause: StoreError,
    ) -> TrialGraphError {
        let report = PartialFailureReport {
            operation: operation.to_string(),
            entity: entity.clone(),
            committed,
            failed_step,
            cause: cause.to_string(),
        };
        warn!(%report, "multi-step operation stopped partway");
        TrialGraphError::PartialFailure(Box::new(report))
    }
}
