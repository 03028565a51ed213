//! Error taxonomy for coordinator and federator operations
//!
//! Every error kind maps to a distinct recovery strategy for the caller:
//! correct the input (`Validation`), re-read and retry (`VersionConflict`),
//! back off and retry (`StoreUnavailable`), or resume the remaining steps
//! of a multi-step operation (`PartialFailure`). `PartialFailure` is never
//! collapsed into a generic failure; it carries the exact committed steps.

use crate::model::{EdgeKey, EntityId};
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the coordinator and the query federator
#[derive(Debug, Error)]
pub enum TrialGraphError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("entity not found: {0}")]
    NotFound(EntityId),

    #[error("version conflict: expected {expected}, store has {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("dangling reference: endpoint {0} does not exist")]
    DanglingReference(EntityId),

    #[error("duplicate relationship: {0}")]
    DuplicateRelationship(EdgeKey),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    PartialFailure(Box<PartialFailureReport>),
}

/// Result type for coordinator and federator operations
pub type TrialGraphResult<T> = Result<T, TrialGraphError>;

impl From<StoreError> for TrialGraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(EntityId::from(id)),
            StoreError::VersionConflict { expected, actual } => {
                Self::VersionConflict { expected, actual }
            }
            // AlreadyExists is handled contextually by the coordinator;
            // reaching this arm means an id collision on a generated id.
            StoreError::AlreadyExists(what) => {
                Self::StoreUnavailable(format!("unexpected existing record: {}", what))
            }
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

/// A store-level write that committed during a multi-step operation
#[derive(Debug, Clone, PartialEq)]
pub enum CommittedStep {
    EdgeRemoved(EdgeKey),
    EdgeCreated(EdgeKey),
    DocumentDeleted(EntityId),
    DocumentWritten { id: EntityId, version: u64 },
}

impl std::fmt::Display for CommittedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EdgeRemoved(key) => write!(f, "edge removed: {}", key),
            Self::EdgeCreated(key) => write!(f, "edge created: {}", key),
            Self::DocumentDeleted(id) => write!(f, "document deleted: {}", id),
            Self::DocumentWritten { id, version } => {
                write!(f, "document written: {} v{}", id, version)
            }
        }
    }
}

/// Deterministic account of a multi-step operation that stopped partway
///
/// Neither backing store can roll back the other, so recovery is forward
/// only: the caller (or the reconciliation sweep) retries the remaining
/// steps. The committed list is never empty — a failure before the first
/// commit surfaces as the plain underlying error instead.
#[derive(Debug, Clone)]
pub struct PartialFailureReport {
    /// The logical operation that stopped (e.g. "delete_entity")
    pub operation: String,
    /// The entity the operation was addressed to
    pub entity: EntityId,
    /// Store-level writes that committed, in order
    pub committed: Vec<CommittedStep>,
    /// The step that failed
    pub failed_step: String,
    /// The underlying failure
    pub cause: String,
}

impl std::fmt::Display for PartialFailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "partial failure in {}({}): {} of {} steps committed, failed at {}: {}",
            self.operation,
            self.entity,
            self.committed.len(),
            self.committed.len() + 1,
            self.failed_step,
            self.cause
        )
    }
}
