//! Store adapters
//!
//! The coordination layer talks to its two backing stores through the
//! `DocumentStore` and `GraphStore` traits. `SqliteDocumentStore` /
//! `SqliteGraphStore` are the persistent adapters (one database file per
//! store); the in-memory adapters back tests.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryDocumentStore, MemoryGraphStore};
pub use sqlite::{SqliteDocumentStore, SqliteGraphStore};
pub use traits::{
    payload_matches_all, DocumentStore, FieldFilter, FilterOp, GraphConstraint, GraphStore,
    StoreError, StoreResult,
};
