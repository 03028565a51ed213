//! Common test utilities for coordination and federation tests
//!
//! Fixtures open both sqlite stores inside a single temporary directory so
//! each test gets an isolated dual-store pair that outlives reopens.

#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use trialgraph::store::{SqliteDocumentStore, SqliteGraphStore};
use trialgraph::{
    DrugRecord, EntityPayload, Properties, RepositoryApi, TrialPhase, TrialRecord, TrialStatus,
};

/// Open a fresh dual-store API over sqlite files under `dir`
pub fn sqlite_api(dir: &TempDir) -> RepositoryApi {
    let documents = SqliteDocumentStore::open(dir.path().join("documents.db"))
        .expect("open document store");
    let graph = SqliteGraphStore::open(dir.path().join("graph.db")).expect("open graph store");
    RepositoryApi::new(Arc::new(documents), Arc::new(graph))
}

/// A valid clinical trial payload with the given title, status, and sponsor
pub fn trial(title: &str, status: TrialStatus, sponsor: &str) -> EntityPayload {
    EntityPayload::ClinicalTrial(TrialRecord {
        title: title.to_string(),
        nct_id: None,
        phase: TrialPhase::Phase3,
        status,
        start_date: "2023-06-01T00:00:00Z".parse().unwrap(),
        end_date: None,
        description: format!("{} study", title),
        primary_outcome: "Change from baseline".to_string(),
        secondary_outcomes: vec!["Safety profile".to_string()],
        inclusion_criteria: vec!["Adults 18-75".to_string()],
        exclusion_criteria: vec![],
        locations: vec!["Copenhagen".to_string()],
        sponsor: sponsor.to_string(),
        metadata: Properties::new(),
    })
}

/// A valid drug compound payload with the given name
pub fn drug(name: &str) -> EntityPayload {
    EntityPayload::DrugCompound(DrugRecord {
        name: name.to_string(),
        molecule_type: "small-molecule".to_string(),
        mechanism_of_action: "kinase inhibitor".to_string(),
        target_proteins: vec!["EGFR".to_string()],
        metadata: Properties::new(),
    })
}
