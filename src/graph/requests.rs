//! Request payloads accepted by the graph operations.
//!
//! Required fields are `Option` so that a missing field surfaces as
//! `InvalidArgument` from the operation rather than as a decoder error.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ObservationInput;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateEntityRequest {
    #[schemars(description = "Unique, case-sensitive entity name")]
    pub name: Option<String>,

    #[serde(rename = "entityType")]
    #[schemars(description = "Free-form type tag (e.g. 'person', 'project', 'agent')")]
    pub entity_type: Option<String>,

    #[schemars(
        description = "Initial observations: plain strings or {text, observed_at?, expires_at?} objects"
    )]
    pub observations: Option<Vec<ObservationInput>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AddObservationRequest {
    #[schemars(description = "Name of the entity to attach the observation to")]
    pub name: Option<String>,

    #[schemars(description = "The fact to record")]
    pub observation: Option<String>,

    #[schemars(description = "Optional ISO 8601 time after which the fact is stale")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateRelationRequest {
    #[schemars(description = "Name of the source entity")]
    pub source: Option<String>,

    #[schemars(description = "Relation verb (e.g. 'built', 'works_at', 'part_of')")]
    pub relation: Option<String>,

    #[schemars(description = "Name of the target entity")]
    pub target: Option<String>,

    #[schemars(description = "Optional ISO 8601 time after which the relation is stale")]
    pub expires_at: Option<String>,
}
