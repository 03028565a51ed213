//! Entity registry: an advisory cache of last-seen store state
//!
//! The registry is never a source of truth. The coordinator records what it
//! last saw in each store here so the background reconciliation sweep can
//! prioritize entities, but no validation decision ever reads it. It may be
//! discarded (`clear`) or lose updates at any time with no effect on
//! correctness.

use crate::model::{EdgeKey, EntityId, Relationship};
use crate::store::{DocumentStore, GraphStore, StoreResult};
use dashmap::DashMap;
use std::collections::HashSet;

/// Last-seen state for one entity
#[derive(Debug, Clone, Default)]
pub struct RegistryRecord {
    /// Last-known document version, `None` if the document is believed gone
    pub document_version: Option<u64>,
    /// Edges believed to reference this entity
    pub edges: HashSet<EdgeKey>,
}

/// Divergence between the cache and the live state of the two stores
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub id: EntityId,
    /// Document version the cache believed in
    pub cached_version: Option<u64>,
    /// Document version the store actually holds
    pub actual_version: Option<u64>,
    /// Edges the cache believed in that the graph store no longer holds
    pub missing_edges: Vec<EdgeKey>,
    /// Edges the graph store holds that the cache did not know about
    pub unknown_edges: Vec<EdgeKey>,
    /// Live edges with at least one endpoint whose document is gone
    pub dangling_edges: Vec<Relationship>,
}

impl DriftReport {
    /// Whether cache and stores agree and no dangling edges exist
    pub fn is_clean(&self) -> bool {
        self.cached_version == self.actual_version
            && self.missing_edges.is_empty()
            && self.unknown_edges.is_empty()
            && self.dangling_edges.is_empty()
    }
}

/// Concurrent identity/version cache over both stores
#[derive(Debug, Default)]
pub struct EntityRegistry {
    records: DashMap<EntityId, RegistryRecord>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a last-seen document version
    pub fn observe_document(&self, id: &EntityId, version: u64) {
        self.records.entry(id.clone()).or_default().document_version = Some(version);
    }

    /// Record that the document is gone
    pub fn observe_document_gone(&self, id: &EntityId) {
        self.records.entry(id.clone()).or_default().document_version = None;
    }

    /// Record a last-seen edge, under both endpoints
    pub fn observe_edge(&self, key: &EdgeKey) {
        for id in [&key.source, &key.target] {
            self.records.entry(id.clone()).or_default().edges.insert(key.clone());
        }
    }

    /// Record that an edge is gone, under both endpoints
    pub fn observe_edge_gone(&self, key: &EdgeKey) {
        for id in [&key.source, &key.target] {
            if let Some(mut record) = self.records.get_mut(id) {
                record.edges.remove(key);
            }
        }
    }

    /// Last-seen state for an entity, if any
    pub fn get(&self, id: &EntityId) -> Option<RegistryRecord> {
        self.records.get(id).map(|r| r.clone())
    }

    /// All identifiers the registry has seen, ascending
    pub fn known_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Discard the whole cache; it rebuilds from subsequent observations
    /// or `reconcile` calls
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Re-read both stores live for one entity, report any divergence from
    /// the cached state, and refresh the cache to observed reality.
    ///
    /// Dangling detection re-reads the document of every edge endpoint;
    /// this is the full cross-store check the write path deliberately
    /// avoids, confined here to the background sweep.
    pub async fn reconcile(
        &self,
        id: &EntityId,
        documents: &dyn DocumentStore,
        graph: &dyn GraphStore,
    ) -> StoreResult<DriftReport> {
        let cached = self.get(id).unwrap_or_default();

        let actual_version = documents.get(id).await?.map(|doc| doc.version);
        let live_edges = graph.edges_incident_to(id).await?;
        let live_keys: HashSet<EdgeKey> = live_edges.iter().map(|e| e.key()).collect();

        let mut missing_edges: Vec<EdgeKey> =
            cached.edges.difference(&live_keys).cloned().collect();
        missing_edges.sort_by_key(|k| k.to_string());
        let mut unknown_edges: Vec<EdgeKey> =
            live_keys.difference(&cached.edges).cloned().collect();
        unknown_edges.sort_by_key(|k| k.to_string());

        let mut dangling_edges = Vec::new();
        for edge in &live_edges {
            // One endpoint is `id`, covered by actual_version; the other
            // needs its own document read.
            let mut dangling = actual_version.is_none();
            if !dangling {
                if let Some(other) = edge.opposite(id) {
                    dangling = documents.get(other).await?.is_none();
                }
            }
            if dangling {
                dangling_edges.push(edge.clone());
            }
        }

        let report = DriftReport {
            id: id.clone(),
            cached_version: cached.document_version,
            actual_version,
            missing_edges,
            unknown_edges,
            dangling_edges,
        };

        self.records.insert(
            id.clone(),
            RegistryRecord {
                document_version: actual_version,
                edges: live_keys,
            },
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DrugRecord, EntityPayload, Properties, Relationship};
    use crate::store::{MemoryDocumentStore, MemoryGraphStore};

    fn drug_payload() -> EntityPayload {
        EntityPayload::DrugCompound(DrugRecord {
            name: "semaglutide".to_string(),
            molecule_type: "peptide".to_string(),
            mechanism_of_action: "GLP-1 receptor agonist".to_string(),
            target_proteins: vec![],
            metadata: Properties::new(),
        })
    }

    #[tokio::test]
    async fn reconcile_reports_clean_when_cache_matches() {
        let docs = MemoryDocumentStore::new();
        let graph = MemoryGraphStore::new();
        let registry = EntityRegistry::new();

        let id = EntityId::from("d1");
        docs.put(&id, &drug_payload(), None).await.unwrap();
        registry.observe_document(&id, 1);

        let report = registry.reconcile(&id, &docs, &graph).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.actual_version, Some(1));
    }

    #[tokio::test]
    async fn reconcile_detects_version_drift_and_unknown_edges() {
        let docs = MemoryDocumentStore::new();
        let graph = MemoryGraphStore::new();
        let registry = EntityRegistry::new();

        let t1 = EntityId::from("t1");
        let d1 = EntityId::from("d1");
        docs.put(&t1, &drug_payload(), None).await.unwrap();
        docs.put(&d1, &drug_payload(), None).await.unwrap();
        registry.observe_document(&t1, 1);

        // Out-of-band write and edge the cache never saw
        docs.put(&t1, &drug_payload(), Some(1)).await.unwrap();
        graph.create_edge(&Relationship::new("t1", "d1", "tests")).await.unwrap();

        let report = registry.reconcile(&t1, &docs, &graph).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.cached_version, Some(1));
        assert_eq!(report.actual_version, Some(2));
        assert_eq!(report.unknown_edges.len(), 1);
        assert!(report.dangling_edges.is_empty());

        // The cache was refreshed; a second pass is clean
        let report = registry.reconcile(&t1, &docs, &graph).await.unwrap();
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn reconcile_flags_dangling_edges() {
        let docs = MemoryDocumentStore::new();
        let graph = MemoryGraphStore::new();
        let registry = EntityRegistry::new();

        let d1 = EntityId::from("d1");
        docs.put(&d1, &drug_payload(), None).await.unwrap();
        // Edge to a trial whose document never existed
        graph.create_edge(&Relationship::new("t1", "d1", "tests")).await.unwrap();

        let report = registry.reconcile(&d1, &docs, &graph).await.unwrap();
        assert_eq!(report.dangling_edges.len(), 1);
        assert_eq!(report.dangling_edges[0].source, EntityId::from("t1"));
    }

    #[tokio::test]
    async fn reconcile_flags_edges_when_own_document_is_gone() {
        let docs = MemoryDocumentStore::new();
        let graph = MemoryGraphStore::new();
        let registry = EntityRegistry::new();

        let t1 = EntityId::from("t1");
        let d1 = EntityId::from("d1");
        docs.put(&d1, &drug_payload(), None).await.unwrap();
        graph.create_edge(&Relationship::new("t1", "d1", "tests")).await.unwrap();

        // Reconciling from the side whose document is missing flags the
        // same edge as reconciling from the surviving side
        let report = registry.reconcile(&t1, &docs, &graph).await.unwrap();
        assert_eq!(report.actual_version, None);
        assert_eq!(report.dangling_edges.len(), 1);
        assert_eq!(report.dangling_edges[0].target, d1);
    }

    #[tokio::test]
    async fn clearing_the_cache_is_harmless() {
        let docs = MemoryDocumentStore::new();
        let graph = MemoryGraphStore::new();
        let registry = EntityRegistry::new();

        let id = EntityId::from("d1");
        docs.put(&id, &drug_payload(), None).await.unwrap();
        registry.observe_document(&id, 1);
        registry.clear();
        assert!(registry.get(&id).is_none());

        // Reconcile rebuilds the record from live state
        let report = registry.reconcile(&id, &docs, &graph).await.unwrap();
        assert_eq!(report.actual_version, Some(1));
        assert_eq!(registry.get(&id).unwrap().document_version, Some(1));
    }
}
