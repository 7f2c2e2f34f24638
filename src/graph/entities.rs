//! Entity and observation operations.
//!
//! Every function here is pure over an in-memory [`GraphDocument`]: callers load the
//! document, apply one operation, and persist the result only on success.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::decay;
use super::requests::{AddObservationRequest, CreateEntityRequest};
use super::types::{optional_timestamp, required, Entity, GraphDocument, Observation, Relation};
use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCreated {
    pub created: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationAdded {
    pub added: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessRecorded {
    pub touched: String,
    pub observations: usize,
}

/// An entity as shown to callers: scored observations plus touching relations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub observations: Vec<ObservationView>,
    pub relations: Vec<RelationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationView {
    pub text: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expired: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub access_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationView {
    pub direction: Direction,
    pub relation: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expired: bool,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Append a new entity. Fails on a missing name/type or a duplicate name.
pub fn create_entity(
    document: &mut GraphDocument,
    request: CreateEntityRequest,
    now: DateTime<Utc>,
) -> Result<EntityCreated, GraphError> {
    let name = required("name", request.name)?;
    let entity_type = required("entityType", request.entity_type)?;

    if document.entity(&name).is_some() {
        return Err(GraphError::Conflict(format!("entity already exists: {name}")));
    }

    let observations = request
        .observations
        .unwrap_or_default()
        .into_iter()
        .map(|input| input.normalize(now))
        .collect::<Result<Vec<_>, _>>()?;

    document.entities.push(Entity {
        name: name.clone(),
        entity_type: entity_type.clone(),
        observations,
        created: now,
        updated: now,
    });

    Ok(EntityCreated {
        created: name,
        entity_type,
    })
}

/// Append one observation to an existing entity and touch its `updated` time.
pub fn add_observation(
    document: &mut GraphDocument,
    request: AddObservationRequest,
    now: DateTime<Utc>,
) -> Result<ObservationAdded, GraphError> {
    let name = required("name", request.name)?;
    let text = required("observation", request.observation)?;
    let expires_at = optional_timestamp("expires_at", request.expires_at)?;

    let entity = document
        .entity_mut(&name)
        .ok_or_else(|| GraphError::NotFound(format!("entity not found: {name}")))?;

    let mut observation = Observation::new(text.clone(), now);
    observation.expires_at = expires_at;
    entity.observations.push(observation);
    entity.updated = now;

    Ok(ObservationAdded {
        added: text,
        to: name,
        expires_at,
    })
}

/// Bump `access_count` and `last_accessed` on every active observation of `name`.
pub fn record_access(
    document: &mut GraphDocument,
    name: &str,
    now: DateTime<Utc>,
) -> Result<AccessRecorded, GraphError> {
    let entity = document
        .entity_mut(name)
        .ok_or_else(|| GraphError::NotFound(format!("entity not found: {name}")))?;

    let mut touched = 0;
    for observation in entity
        .observations
        .iter_mut()
        .filter(|o| !o.is_expired(now))
    {
        observation.access_count = observation.access_count.saturating_add(1);
        observation.last_accessed = Some(now);
        touched += 1;
    }

    Ok(AccessRecorded {
        touched: name.to_string(),
        observations: touched,
    })
}

/// Scored view of one entity. Expired items are omitted unless `include_expired`.
pub fn view_entity(
    document: &GraphDocument,
    name: &str,
    include_expired: bool,
    now: DateTime<Utc>,
) -> Result<EntityView, GraphError> {
    let entity = document
        .entity(name)
        .ok_or_else(|| GraphError::NotFound(format!("entity not found: {name}")))?;
    Ok(entity_view(document, entity, include_expired, now))
}

/// View of an entity already known to be in `document`.
pub fn entity_view(
    document: &GraphDocument,
    entity: &Entity,
    include_expired: bool,
    now: DateTime<Utc>,
) -> EntityView {
    let relations = document
        .relations
        .iter()
        .filter(|r| include_expired || !r.is_expired(now))
        .filter_map(|r| relation_view(r, &entity.name, now))
        .collect();

    EntityView {
        name: entity.name.clone(),
        entity_type: entity.entity_type.clone(),
        created: entity.created,
        updated: entity.updated,
        observations: observation_views(entity, include_expired, now),
        relations,
    }
}

/// Scored views of an entity's observations, in insertion order.
pub fn observation_views(
    entity: &Entity,
    include_expired: bool,
    now: DateTime<Utc>,
) -> Vec<ObservationView> {
    entity
        .observations
        .iter()
        .filter(|o| include_expired || !o.is_expired(now))
        .map(|o| ObservationView {
            text: o.text.clone(),
            score: decay::round_score(decay::score(o, now)),
            observed_at: o.observed_at,
            expires_at: o.expires_at,
            expired: o.is_expired(now),
            access_count: o.access_count,
            last_accessed: o.last_accessed,
        })
        .collect()
}

/// A self-loop is reported once, as outgoing.
fn relation_view(relation: &Relation, name: &str, now: DateTime<Utc>) -> Option<RelationView> {
    let (direction, peer) = if relation.source == name {
        (Direction::Outgoing, &relation.target)
    } else if relation.target == name {
        (Direction::Incoming, &relation.source)
    } else {
        return None;
    };

    Some(RelationView {
        direction,
        relation: relation.relation.clone(),
        entity: peer.clone(),
        expires_at: relation.expires_at,
        expired: relation.is_expired(now),
    })
}
