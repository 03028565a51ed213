//! End-to-end coordination tests over the sqlite adapters
//!
//! These exercise the write ordering, optimistic concurrency, cascading
//! delete, and reconciliation paths through the public API, with both
//! stores persisted to disk.

mod common;

use common::{drug, sqlite_api, trial};
use std::sync::Arc;
use tempfile::TempDir;
use trialgraph::store::{DocumentStore, SqliteDocumentStore};
use trialgraph::{
    EntityId, EntityPayload, Properties, TrialGraphError, TrialRecord, TrialStatus,
};

#[tokio::test]
async fn create_then_get_returns_version_one() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (id, version) = api
        .create_entity(trial("Semaglutide obesity", TrialStatus::Active, "Novo Nordisk"))
        .await
        .unwrap();
    assert_eq!(version, 1);

    let doc = api.get_entity(&id).await.unwrap();
    assert_eq!(doc.version, 1);
    match &doc.payload {
        EntityPayload::ClinicalTrial(record) => {
            assert_eq!(record.title, "Semaglutide obesity");
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn stale_update_conflicts_and_leaves_document_intact() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (id, _) = api
        .create_entity(trial("Osimertinib NSCLC", TrialStatus::Recruiting, "AstraZeneca"))
        .await
        .unwrap();

    let v2 = api
        .update_entity(&id, 1, trial("Osimertinib NSCLC", TrialStatus::Active, "AstraZeneca"))
        .await
        .unwrap();
    assert_eq!(v2, 2);

    // Second writer still holds version 1
    let err = api
        .update_entity(&id, 1, trial("Osimertinib NSCLC", TrialStatus::Completed, "AstraZeneca"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TrialGraphError::VersionConflict { expected: 1, actual: 2 }
    ));

    let doc = api.get_entity(&id).await.unwrap();
    assert_eq!(doc.version, 2);
    match &doc.payload {
        EntityPayload::ClinicalTrial(record) => assert_eq!(record.status, TrialStatus::Active),
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_updates_have_exactly_one_winner() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (id, _) = api
        .create_entity(trial("Dose escalation", TrialStatus::Planned, "Roche"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let api = api.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            api.update_entity(&id, 1, trial("Dose escalation", TrialStatus::Active, "Roche"))
                .await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(2) => wins += 1,
            Ok(v) => panic!("unexpected version {}", v),
            Err(TrialGraphError::VersionConflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(api.get_entity(&id).await.unwrap().version, 2);
}

#[tokio::test]
async fn link_requires_both_endpoints() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (trial_id, _) = api
        .create_entity(trial("KRAS inhibitor trial", TrialStatus::Active, "Amgen"))
        .await
        .unwrap();

    let err = api
        .link_entities(&trial_id, &EntityId::from("missing"), "tests", Properties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TrialGraphError::DanglingReference(id) if id.as_str() == "missing"));

    // Nothing was written graph-side
    assert!(api.edges_of(&trial_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_link_is_rejected_and_unlink_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (t, _) = api
        .create_entity(trial("Sotorasib lung", TrialStatus::Active, "Amgen"))
        .await
        .unwrap();
    let (d, _) = api.create_entity(drug("sotorasib")).await.unwrap();

    api.link_entities(&t, &d, "tests", Properties::new()).await.unwrap();
    let err = api
        .link_entities(&t, &d, "tests", Properties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TrialGraphError::DuplicateRelationship(_)));

    // Same endpoints under a different kind is a distinct edge
    api.link_entities(&t, &d, "related-to", Properties::new()).await.unwrap();
    assert_eq!(api.edges_of(&t).await.unwrap().len(), 2);

    api.unlink_entities(&t, &d, "tests").await.unwrap();
    api.unlink_entities(&t, &d, "tests").await.unwrap();
    assert_eq!(api.edges_of(&t).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_cascades_edges_then_document() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (t, _) = api
        .create_entity(trial("Pembrolizumab melanoma", TrialStatus::Completed, "Merck"))
        .await
        .unwrap();
    let (d, _) = api.create_entity(drug("pembrolizumab")).await.unwrap();
    api.link_entities(&t, &d, "tests", Properties::new()).await.unwrap();

    api.delete_entity(&t).await.unwrap();

    assert!(matches!(
        api.get_entity(&t).await.unwrap_err(),
        TrialGraphError::NotFound(_)
    ));
    // The surviving endpoint sees no leftover edge
    assert!(api.edges_of(&d).await.unwrap().is_empty());
    // Deleting again reports NotFound
    assert!(matches!(
        api.delete_entity(&t).await.unwrap_err(),
        TrialGraphError::NotFound(_)
    ));
}

#[tokio::test]
async fn entities_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let id;
    {
        let api = sqlite_api(&dir);
        let (created, _) = api
            .create_entity(trial("Durability study", TrialStatus::Active, "Pfizer"))
            .await
            .unwrap();
        let (d, _) = api.create_entity(drug("candidate-7")).await.unwrap();
        api.link_entities(&created, &d, "tests", Properties::new()).await.unwrap();
        id = created;
    }

    let api = sqlite_api(&dir);
    let doc = api.get_entity(&id).await.unwrap();
    assert_eq!(doc.version, 1);
    assert_eq!(api.edges_of(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reconcile_detects_and_repairs_dangling_edges() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let (t, _) = api
        .create_entity(trial("Orphan edge study", TrialStatus::Active, "Bayer"))
        .await
        .unwrap();
    let (d, _) = api.create_entity(drug("bay-001")).await.unwrap();
    api.link_entities(&t, &d, "tests", Properties::new()).await.unwrap();

    // Remove the drug document behind the coordinator's back, stranding
    // the edge the way a crashed delete would.
    let raw: Arc<dyn DocumentStore> =
        Arc::new(SqliteDocumentStore::open(dir.path().join("documents.db")).unwrap());
    assert!(raw.delete(&d).await.unwrap());

    let report = api.reconcile(&t).await.unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.dangling_edges.len(), 1);

    let removed = api.repair_drift(&report).await.unwrap();
    assert_eq!(removed, 1);
    assert!(api.edges_of(&t).await.unwrap().is_empty());
    assert!(api.reconcile(&t).await.unwrap().is_clean());
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_stores() {
    let dir = TempDir::new().unwrap();
    let api = sqlite_api(&dir);

    let bad = EntityPayload::ClinicalTrial(TrialRecord {
        title: String::new(),
        nct_id: None,
        phase: trialgraph::TrialPhase::Phase1,
        status: TrialStatus::Planned,
        start_date: "2023-06-01T00:00:00Z".parse().unwrap(),
        end_date: None,
        description: "incomplete".to_string(),
        primary_outcome: "none".to_string(),
        secondary_outcomes: vec![],
        inclusion_criteria: vec![],
        exclusion_criteria: vec![],
        locations: vec![],
        sponsor: "Nobody".to_string(),
        metadata: Properties::new(),
    });

    let err = api
        .create_entity_with_id("bad".into(), bad)
        .await
        .unwrap_err();
    assert!(matches!(err, TrialGraphError::Validation(_)));
    assert!(matches!(
        api.get_entity(&"bad".into()).await.unwrap_err(),
        TrialGraphError::NotFound(_)
    ));
}
