//! Core data model: entities, documents, and relationship edges

mod entity;
mod relationship;

pub use entity::{
    DrugRecord, EntityDocument, EntityId, EntityKind, EntityPayload, Properties, PropertyValue,
    TrialPhase, TrialRecord, TrialStatus,
};
pub use relationship::{EdgeKey, Relationship, RelationshipKind};
