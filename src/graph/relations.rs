//! Directed relation creation.
//!
//! Both endpoints must exist at creation time, and the `(source, relation, target)`
//! triple is unique, expired relations included.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::requests::CreateRelationRequest;
use super::types::{optional_timestamp, required, GraphDocument, Relation};
use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationCreated {
    /// `source --[relation]--> target`
    pub created: String,
}

pub fn create_relation(
    document: &mut GraphDocument,
    request: CreateRelationRequest,
    now: DateTime<Utc>,
) -> Result<RelationCreated, GraphError> {
    let source = required("source", request.source)?;
    let relation = required("relation", request.relation)?;
    let target = required("target", request.target)?;
    let expires_at = optional_timestamp("expires_at", request.expires_at)?;

    for (role, name) in [("source", &source), ("target", &target)] {
        if document.entity(name).is_none() {
            return Err(GraphError::NotFound(format!("{role} entity not found: {name}")));
        }
    }

    if document.has_relation(&source, &relation, &target) {
        return Err(GraphError::Conflict(format!(
            "relation already exists: {source} --[{relation}]--> {target}"
        )));
    }

    let created = Relation {
        source,
        relation,
        target,
        created: now,
        expires_at,
    };
    let label = created.label();
    document.relations.push(created);

    Ok(RelationCreated { created: label })
}
