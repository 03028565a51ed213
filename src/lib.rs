//! TrialGraph: Dual-Store Coordination Layer for Clinical-Trial Metadata
//!
//! Clinical-trial entities live in two stores at once: a document store holds
//! the full versioned record, and a graph store holds the relationship edges
//! between records. Neither store knows about the other, and there is no
//! cross-store transaction. This crate is the layer that keeps the pair
//! coherent.
//!
//! # Core Concepts
//!
//! - **Entities**: clinical trials and drug compounds, each a versioned
//!   document plus a node implied by the edges that touch it
//! - **Relationships**: typed, attributed edges ("tests", "produces", ...)
//!   whose endpoints must exist as documents when the edge is created
//! - **Coordination**: a fixed write ordering (document before graph on
//!   create, graph before document on delete) with forward-only recovery
//!   and explicit partial-failure reports
//! - **Federation**: queries that combine document field filters with graph
//!   constraints, planned graph-side first
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trialgraph::store::{MemoryDocumentStore, MemoryGraphStore};
//! use trialgraph::RepositoryApi;
//!
//! let api = RepositoryApi::new(
//!     Arc::new(MemoryDocumentStore::new()),
//!     Arc::new(MemoryGraphStore::new()),
//! );
//! // Ready for writes and federated queries
//! ```

mod api;
mod coordinator;
mod error;
mod model;
pub mod query;
mod registry;
pub mod store;

pub use api::{HealthStatus, RepositoryApi};
pub use coordinator::Coordinator;
pub use error::{CommittedStep, PartialFailureReport, TrialGraphError, TrialGraphResult};
pub use model::{
    DrugRecord, EdgeKey, EntityDocument, EntityId, EntityKind, EntityPayload, Properties,
    PropertyValue, Relationship, RelationshipKind, TrialPhase, TrialRecord, TrialStatus,
};
pub use query::{EnrichedEntity, FederatedQuery, QueryFederator};
pub use registry::{DriftReport, EntityRegistry, RegistryRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
