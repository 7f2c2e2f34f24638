//! Core graph type definitions.
//!
//! Defines the persisted shapes ([`GraphDocument`], [`Entity`], [`Observation`],
//! [`Relation`]) and [`ObservationInput`], the ingestion shape that accepts either a
//! bare string or a structured object and normalizes it once.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// The whole graph, persisted as one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl GraphDocument {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    pub fn has_relation(&self, source: &str, relation: &str, target: &str) -> bool {
        self.relations
            .iter()
            .any(|r| r.source == source && r.relation == relation && r.target == target)
    }
}

/// A named node. `name` is unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<Observation>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A timestamped fact owned by one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
    /// When the fact became true. Scored as "now" when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u32,
    /// Base weight. Reads never change it.
    #[serde(default = "default_relevance")]
    pub relevance: f64,
}

fn default_relevance() -> f64 {
    1.0
}

impl Observation {
    /// A fresh observation of `text` at `now`.
    pub fn new(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            observed_at: Some(now),
            expires_at: None,
            last_accessed: None,
            access_count: 0,
            relevance: default_relevance(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A directed, labeled edge `source --[relation]--> target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub relation: String,
    pub target: String,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Relation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// `source --[relation]--> target`
    pub fn label(&self) -> String {
        format!("{} --[{}]--> {}", self.source, self.relation, self.target)
    }
}

/// An observation as supplied by a caller: a bare string or a structured object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ObservationInput {
    Text(String),
    Detailed {
        #[schemars(description = "The fact itself")]
        text: Option<String>,
        #[schemars(description = "ISO 8601 time the fact became true. Defaults to now.")]
        observed_at: Option<String>,
        #[schemars(description = "ISO 8601 time after which the fact is stale")]
        expires_at: Option<String>,
    },
}

impl ObservationInput {
    /// Normalize into the canonical [`Observation`] shape.
    pub fn normalize(self, now: DateTime<Utc>) -> Result<Observation, GraphError> {
        match self {
            Self::Text(text) => Ok(Observation::new(required("observation text", Some(text))?, now)),
            Self::Detailed {
                text,
                observed_at,
                expires_at,
            } => {
                let mut observation = Observation::new(required("observation text", text)?, now);
                if let Some(at) = observed_at {
                    observation.observed_at = Some(parse_timestamp("observed_at", &at)?);
                }
                observation.expires_at = optional_timestamp("expires_at", expires_at)?;
                Ok(observation)
            }
        }
    }
}

/// Unwrap a required string field. Empty or whitespace-only counts as missing.
pub fn required(field: &str, value: Option<String>) -> Result<String, GraphError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GraphError::invalid(format!("missing required field: {field}")))
}

/// Parse an ISO 8601 timestamp: full RFC 3339, or a bare date at midnight UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, GraphError> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| GraphError::invalid(format!("{field} is not an ISO 8601 timestamp: {value}")))
}

pub fn optional_timestamp(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, GraphError> {
    value.map(|v| parse_timestamp(field, &v)).transpose()
}
