//! SQLite store adapters
//!
//! One database file per store so the two stores fail independently — the
//! coordination layer never assumes a shared transaction boundary between
//! them. Thread-safe via an internal mutex on each connection.

use super::traits::{
    payload_matches_all, DocumentStore, FieldFilter, GraphConstraint, GraphStore, StoreError,
    StoreResult,
};
use crate::model::{
    EntityDocument, EntityId, EntityKind, EntityPayload, Properties, Relationship,
    RelationshipKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::DateParse(format!("{}: {}", raw, e)))
}

/// SQLite-backed document store
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open or create a document store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create an in-memory document store (useful for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                version INTEGER NOT NULL,
                payload_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_kind
                ON documents(kind);

            -- Concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn row_to_document(
        id: String,
        kind: String,
        version: u64,
        payload_json: String,
        created_at: String,
        updated_at: String,
    ) -> StoreResult<EntityDocument> {
        let kind: EntityKind = kind
            .parse()
            .map_err(|e: String| StoreError::Unavailable(e))?;
        Ok(EntityDocument {
            id: EntityId::from(id),
            kind,
            version,
            payload: serde_json::from_str(&payload_json)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn put(
        &self,
        id: &EntityId,
        payload: &EntityPayload,
        expected_version: Option<u64>,
    ) -> StoreResult<u64> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let payload_json = serde_json::to_string(payload)?;

        let current: Option<u64> = conn
            .query_row(
                "SELECT version FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match (expected_version, current) {
            (None, Some(_)) => Err(StoreError::AlreadyExists(id.to_string())),
            (None, None) => {
                conn.execute(
                    "INSERT INTO documents (id, kind, version, payload_json, created_at, updated_at)
                     VALUES (?1, ?2, 1, ?3, ?4, ?4)",
                    params![id.as_str(), payload.kind().as_str(), payload_json, now],
                )?;
                Ok(1)
            }
            (Some(_), None) => Err(StoreError::NotFound(id.to_string())),
            (Some(expected), Some(actual)) => {
                if actual != expected {
                    return Err(StoreError::VersionConflict { expected, actual });
                }
                // The version guard in the WHERE clause keeps the write
                // atomic even if another writer slipped in after the read.
                let changed = conn.execute(
                    "UPDATE documents
                     SET version = ?2, kind = ?3, payload_json = ?4, updated_at = ?5
                     WHERE id = ?1 AND version = ?6",
                    params![
                        id.as_str(),
                        expected + 1,
                        payload.kind().as_str(),
                        payload_json,
                        now,
                        expected
                    ],
                )?;
                if changed == 0 {
                    let actual: u64 = conn
                        .query_row(
                            "SELECT version FROM documents WHERE id = ?1",
                            params![id.as_str()],
                            |row| row.get(0),
                        )
                        .optional()?
                        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                    return Err(StoreError::VersionConflict { expected, actual });
                }
                Ok(expected + 1)
            }
        }
    }

    async fn get(&self, id: &EntityId) -> StoreResult<Option<EntityDocument>> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let row = conn
            .query_row(
                "SELECT id, kind, version, payload_json, created_at, updated_at
                 FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((id, kind, version, payload, created, updated)) => Ok(Some(
                Self::row_to_document(id, kind, version, payload, created, updated)?,
            )),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &EntityId) -> StoreResult<bool> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let changed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    async fn query_by_fields(
        &self,
        kind: Option<EntityKind>,
        filters: &[FieldFilter],
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<EntityDocument>> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut stmt = match kind {
            Some(_) => conn.prepare(
                "SELECT id, kind, version, payload_json, created_at, updated_at
                 FROM documents WHERE kind = ?1 ORDER BY id",
            )?,
            None => conn.prepare(
                "SELECT id, kind, version, payload_json, created_at, updated_at
                 FROM documents ORDER BY id",
            )?,
        };
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        };
        let rows: Vec<_> = match kind {
            Some(k) => stmt
                .query_map(params![k.as_str()], map_row)?
                .collect::<Result<_, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<_, _>>()?,
        };

        let mut matched = Vec::new();
        for (id, kind, version, payload_json, created, updated) in rows {
            // Field predicates evaluate against the payload JSON, shared
            // with the in-memory adapter for identical semantics.
            let json: serde_json::Value = serde_json::from_str(&payload_json)?;
            if !payload_matches_all(&json, filters) {
                continue;
            }
            matched.push(Self::row_to_document(
                id, kind, version, payload_json, created, updated,
            )?);
        }
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }
}

/// SQLite-backed graph store
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open or create a graph store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create an in-memory graph store (useful for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS edges (
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                attributes_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (source_id, target_id, kind)
            );

            CREATE INDEX IF NOT EXISTS idx_edges_source
                ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target
                ON edges(target_id);
            CREATE INDEX IF NOT EXISTS idx_edges_kind
                ON edges(kind);

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn row_to_edge(
        source: String,
        target: String,
        kind: String,
        attributes_json: String,
        created_at: String,
    ) -> StoreResult<Relationship> {
        let attributes: Properties = serde_json::from_str(&attributes_json)?;
        Ok(Relationship {
            source: EntityId::from(source),
            target: EntityId::from(target),
            kind: RelationshipKind::from(kind),
            attributes,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn all_edges(conn: &Connection) -> StoreResult<Vec<Relationship>> {
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, kind, attributes_json, created_at FROM edges",
        )?;
        let rows: Vec<_> = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<_, _>>()?;
        rows.into_iter()
            .map(|(s, t, k, a, c)| Self::row_to_edge(s, t, k, a, c))
            .collect()
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn create_edge(&self, edge: &Relationship) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM edges WHERE source_id = ?1 AND target_id = ?2 AND kind = ?3",
                params![edge.source.as_str(), edge.target.as_str(), edge.kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::AlreadyExists(edge.key().to_string()));
        }
        conn.execute(
            "INSERT INTO edges (source_id, target_id, kind, attributes_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                edge.source.as_str(),
                edge.target.as_str(),
                edge.kind.as_str(),
                serde_json::to_string(&edge.attributes)?,
                edge.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn delete_edge(
        &self,
        source: &EntityId,
        target: &EntityId,
        kind: &RelationshipKind,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let changed = conn.execute(
            "DELETE FROM edges WHERE source_id = ?1 AND target_id = ?2 AND kind = ?3",
            params![source.as_str(), target.as_str(), kind.as_str()],
        )?;
        Ok(changed > 0)
    }

    async fn edges_incident_to(&self, id: &EntityId) -> StoreResult<Vec<Relationship>> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, kind, attributes_json, created_at
             FROM edges WHERE source_id = ?1 OR target_id = ?1
             ORDER BY source_id, target_id, kind",
        )?;
        let rows: Vec<_> = stmt
            .query_map(params![id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<_, _>>()?;
        rows.into_iter()
            .map(|(s, t, k, a, c)| Self::row_to_edge(s, t, k, a, c))
            .collect()
    }

    async fn traverse(&self, constraint: &GraphConstraint) -> StoreResult<Vec<EntityId>> {
        let conn = self.conn.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut ids = BTreeSet::new();
        for edge in Self::all_edges(&conn)? {
            if constraint.matches(&edge) {
                for id in constraint.candidates_of(&edge) {
                    ids.insert(id.clone());
                }
            }
        }
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DrugRecord, PropertyValue};

    fn drug_payload(name: &str) -> EntityPayload {
        EntityPayload::DrugCompound(DrugRecord {
            name: name.to_string(),
            molecule_type: "peptide".to_string(),
            mechanism_of_action: "GLP-1 receptor agonist".to_string(),
            target_proteins: vec!["GLP1R".to_string()],
            metadata: Properties::new(),
        })
    }

    #[tokio::test]
    async fn document_round_trip_with_versioning() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = EntityId::from("d1");

        assert_eq!(store.put(&id, &drug_payload("semaglutide"), None).await.unwrap(), 1);
        assert_eq!(store.put(&id, &drug_payload("semaglutide"), Some(1)).await.unwrap(), 2);

        let err = store.put(&id, &drug_payload("stale"), Some(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 1, actual: 2 }));

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.payload, drug_payload("semaglutide"));

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn query_by_fields_filters_and_orders() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        store.put(&"d2".into(), &drug_payload("tirzepatide"), None).await.unwrap();
        store.put(&"d1".into(), &drug_payload("semaglutide"), None).await.unwrap();
        store.put(&"d3".into(), &drug_payload("liraglutide"), None).await.unwrap();

        let filters = vec![FieldFilter::contains("name", "glutide")];
        let docs = store
            .query_by_fields(Some(EntityKind::DrugCompound), &filters, 100, 0)
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, EntityId::from("d1"));
        assert_eq!(docs[1].id, EntityId::from("d3"));

        let paged = store
            .query_by_fields(Some(EntityKind::DrugCompound), &[], 2, 1)
            .await
            .unwrap();
        assert_eq!(paged.len(), 2);
        assert_eq!(paged[0].id, EntityId::from("d2"));
    }

    #[tokio::test]
    async fn edges_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");

        {
            let store = SqliteGraphStore::open(&path).unwrap();
            let edge = Relationship::new("t1", "d1", "tests")
                .with_attribute("dosage", PropertyValue::String("2.4mg".to_string()));
            store.create_edge(&edge).await.unwrap();
        }

        let store = SqliteGraphStore::open(&path).unwrap();
        let edges = store.edges_incident_to(&"t1".into()).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationshipKind::Tests);
        assert_eq!(
            edges[0].attributes.get("dosage"),
            Some(&PropertyValue::String("2.4mg".to_string()))
        );
    }

    #[tokio::test]
    async fn edge_uniqueness_and_traverse() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.create_edge(&Relationship::new("t1", "d1", "tests")).await.unwrap();
        store.create_edge(&Relationship::new("t2", "d1", "tests")).await.unwrap();

        let err = store
            .create_edge(&Relationship::new("t1", "d1", "tests"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let trials = store
            .traverse(&GraphConstraint::new().with_kind("tests").to_target("d1"))
            .await
            .unwrap();
        assert_eq!(trials, vec![EntityId::from("t1"), EntityId::from("t2")]);

        assert!(store
            .delete_edge(&"t1".into(), &"d1".into(), &"tests".into())
            .await
            .unwrap());
        assert!(!store
            .delete_edge(&"t1".into(), &"d1".into(), &"tests".into())
            .await
            .unwrap());
    }
}
