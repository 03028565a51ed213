//! In-memory store adapters
//!
//! Used by tests and as the reference semantics for adapter implementations.
//! The compare-and-set in `put` and the duplicate check in `create_edge` go
//! through the `DashMap` entry API, so concurrent racers on the same key
//! serialize and exactly one wins.

use super::traits::{
    payload_matches_all, DocumentStore, FieldFilter, GraphConstraint, GraphStore, StoreError,
    StoreResult,
};
use crate::model::{
    EdgeKey, EntityDocument, EntityId, EntityKind, EntityPayload, Relationship, RelationshipKind,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// DashMap-backed document store
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<EntityId, EntityDocument>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(
        &self,
        id: &EntityId,
        payload: &EntityPayload,
        expected_version: Option<u64>,
    ) -> StoreResult<u64> {
        let now = Utc::now();
        match self.documents.entry(id.clone()) {
            Entry::Vacant(slot) => match expected_version {
                None => {
                    slot.insert(EntityDocument {
                        id: id.clone(),
                        kind: payload.kind(),
                        version: 1,
                        payload: payload.clone(),
                        created_at: now,
                        updated_at: now,
                    });
                    Ok(1)
                }
                Some(_) => Err(StoreError::NotFound(id.to_string())),
            },
            Entry::Occupied(mut slot) => match expected_version {
                None => Err(StoreError::AlreadyExists(id.to_string())),
                Some(expected) => {
                    let doc = slot.get_mut();
                    if doc.version != expected {
                        return Err(StoreError::VersionConflict {
                            expected,
                            actual: doc.version,
                        });
                    }
                    doc.version = expected + 1;
                    doc.kind = payload.kind();
                    doc.payload = payload.clone();
                    doc.updated_at = now;
                    Ok(doc.version)
                }
            },
        }
    }

    async fn get(&self, id: &EntityId) -> StoreResult<Option<EntityDocument>> {
        Ok(self.documents.get(id).map(|r| r.clone()))
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<bool> {
        Ok(self.documents.remove(id).is_some())
    }

    async fn query_by_fields(
        &self,
        kind: Option<EntityKind>,
        filters: &[FieldFilter],
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<EntityDocument>> {
        let mut matched = Vec::new();
        for entry in self.documents.iter() {
            let doc = entry.value();
            if let Some(k) = kind {
                if doc.kind != k {
                    continue;
                }
            }
            let json = serde_json::to_value(&doc.payload)?;
            if payload_matches_all(&json, filters) {
                matched.push(doc.clone());
            }
        }
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }
}

/// DashMap-backed graph store
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    edges: DashMap<EdgeKey, Relationship>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn create_edge(&self, edge: &Relationship) -> StoreResult<()> {
        match self.edges.entry(edge.key()) {
            Entry::Vacant(slot) => {
                slot.insert(edge.clone());
                Ok(())
            }
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(edge.key().to_string())),
        }
    }

    async fn delete_edge(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: &RelationshipKind,
    ) -> StoreResult<bool> {
        let key = EdgeKey {
            source: source.clone(),
            target: target.clone(),
            kind: kind.clone(),
        };
        Ok(self.edges.remove(&key).is_some())
    }

    async fn edges_incident_to(&self, id: &EntityId) -> StoreResult<Vec<Relationship>> {
        let mut edges: Vec<Relationship> = self
            .edges
            .iter()
            .filter(|e| e.value().touches(id))
            .map(|e| e.value().clone())
            .collect();
        edges.sort_by(|a, b| a.key().to_string().cmp(&b.key().to_string()));
        Ok(edges)
    }

    async fn traverse(&self, constraint: &GraphConstraint) -> StoreResult<Vec<EntityId>> {
        let mut ids = BTreeSet::new();
        for entry in self.edges.iter() {
            let edge = entry.value();
            if constraint.matches(edge) {
                for id in constraint.candidates_of(edge) {
                    ids.insert(id.clone());
                }
            }
        }
        Ok(ids.into_iter().collect())
    }
}
