//! Relationship edges between entities

use super::entity::{EntityId, Properties, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a relationship edge
///
/// The well-known kinds cover the original schema ("tests" connects a trial
/// to the compound it evaluates); `Custom` carries anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationshipKind {
    Tests,
    Produces,
    RelatedTo,
    Custom(String),
}

impl RelationshipKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tests => "tests",
            Self::Produces => "produces",
            Self::RelatedTo => "related-to",
            Self::Custom(s) => s,
        }
    }
}

impl From<String> for RelationshipKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tests" => Self::Tests,
            "produces" => Self::Produces,
            "related-to" => Self::RelatedTo,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for RelationshipKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<RelationshipKind> for String {
    fn from(kind: RelationshipKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The uniqueness key of an edge: at most one edge per (source, target, kind)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationshipKind,
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.kind, self.target)
    }
}

/// A directed edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationshipKind,
    #[serde(default)]
    pub attributes: Properties,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Create a new edge with empty attributes
    pub fn new(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        kind: impl Into<RelationshipKind>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: kind.into(),
            attributes: Properties::new(),
            created_at: Utc::now(),
        }
    }

    /// Add an attribute to the edge
    pub fn with_attribute(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// The uniqueness key of this edge
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Whether the given entity is one of this edge's endpoints
    pub fn touches(&self, id: &EntityId) -> bool {
        &self.source == id || &self.target == id
    }

    /// The endpoint opposite to the given one, if the edge touches it
    pub fn opposite(&self, id: &EntityId) -> Option<&EntityId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(RelationshipKind::from("tests"), RelationshipKind::Tests);
        assert_eq!(RelationshipKind::from("related-to"), RelationshipKind::RelatedTo);
        assert_eq!(
            RelationshipKind::from("used_in"),
            RelationshipKind::Custom("used_in".to_string())
        );
        assert_eq!(RelationshipKind::Produces.as_str(), "produces");
    }

    #[test]
    fn kind_serializes_as_plain_string() {
        let json = serde_json::to_string(&RelationshipKind::Tests).unwrap();
        assert_eq!(json, "\"tests\"");
        let back: RelationshipKind = serde_json::from_str("\"used_in\"").unwrap();
        assert_eq!(back, RelationshipKind::Custom("used_in".to_string()));
    }

    #[test]
    fn opposite_endpoint() {
        let edge = Relationship::new("t1", "d1", "tests");
        assert_eq!(edge.opposite(&"t1".into()), Some(&"d1".into()));
        assert_eq!(edge.opposite(&"d1".into()), Some(&"t1".into()));
        assert_eq!(edge.opposite(&"x".into()), None);
        assert!(edge.touches(&"t1".into()));
        assert!(!edge.touches(&"x".into()));
    }
}
