//! Entity identity and document-shaped records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a logical entity
///
/// Generated ids are UUIDv4 strings, but caller-supplied ids are accepted
/// unchanged. Ordering is the lexicographic order of the underlying string,
/// which the query layer relies on for stable pagination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new random EntityId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two document-shaped entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    ClinicalTrial,
    DrugCompound,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClinicalTrial => "clinical_trial",
            Self::DrugCompound => "drug_compound",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clinical_trial" => Ok(Self::ClinicalTrial),
            "drug_compound" => Ok(Self::DrugCompound),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

/// Clinical trial phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPhase {
    #[serde(rename = "1")]
    Phase1,
    #[serde(rename = "2")]
    Phase2,
    #[serde(rename = "3")]
    Phase3,
    #[serde(rename = "4")]
    Phase4,
}

impl TrialPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phase1 => "1",
            Self::Phase2 => "2",
            Self::Phase3 => "3",
            Self::Phase4 => "4",
        }
    }
}

impl std::str::FromStr for TrialPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::Phase1),
            "2" => Ok(Self::Phase2),
            "3" => Ok(Self::Phase3),
            "4" => Ok(Self::Phase4),
            other => Err(format!("unknown trial phase: {}", other)),
        }
    }
}

/// Clinical trial lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Planned,
    Recruiting,
    Active,
    Completed,
    Terminated,
}

impl TrialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Recruiting => "recruiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        }
    }
}

impl std::str::FromStr for TrialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "recruiting" => Ok(Self::Recruiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "terminated" => Ok(Self::Terminated),
            other => Err(format!("unknown trial status: {}", other)),
        }
    }
}

/// Typed property values for free-form metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// A clinical trial record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nct_id: Option<String>,
    pub phase: TrialPhase,
    pub status: TrialStatus,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub description: String,
    pub primary_outcome: String,
    #[serde(default)]
    pub secondary_outcomes: Vec<String>,
    #[serde(default)]
    pub inclusion_criteria: Vec<String>,
    #[serde(default)]
    pub exclusion_criteria: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    pub sponsor: String,
    #[serde(default)]
    pub metadata: Properties,
}

impl TrialRecord {
    /// Check required-field constraints
    pub fn validate(&self) -> Result<(), String> {
        require_non_empty("title", &self.title)?;
        require_non_empty("description", &self.description)?;
        require_non_empty("primary_outcome", &self.primary_outcome)?;
        require_non_empty("sponsor", &self.sponsor)?;
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err("end_date must be after start_date".to_string());
            }
        }
        Ok(())
    }
}

/// A drug compound record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub name: String,
    pub molecule_type: String,
    pub mechanism_of_action: String,
    #[serde(default)]
    pub target_proteins: Vec<String>,
    #[serde(default)]
    pub metadata: Properties,
}

impl DrugRecord {
    /// Check required-field constraints
    pub fn validate(&self) -> Result<(), String> {
        require_non_empty("name", &self.name)?;
        require_non_empty("molecule_type", &self.molecule_type)?;
        require_non_empty("mechanism_of_action", &self.mechanism_of_action)?;
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

/// The payload of an entity document, tagged by kind
///
/// Internally tagged so the record fields stay at the top level of the
/// payload JSON; field filters address them directly (e.g. `"status"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPayload {
    ClinicalTrial(TrialRecord),
    DrugCompound(DrugRecord),
}

impl EntityPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::ClinicalTrial(_) => EntityKind::ClinicalTrial,
            Self::DrugCompound(_) => EntityKind::DrugCompound,
        }
    }

    /// Check required-field constraints for the payload's kind
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::ClinicalTrial(trial) => trial.validate(),
            Self::DrugCompound(drug) => drug.validate(),
        }
    }
}

/// A versioned entity document as stored in the document store
///
/// The logical version starts at 1 and increments on every successful
/// write. The document store owns version assignment and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    pub id: EntityId,
    pub kind: EntityKind,
    pub version: u64,
    pub payload: EntityPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
