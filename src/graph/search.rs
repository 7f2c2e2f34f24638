//! Case-insensitive substring search over entities.
//!
//! The haystack for each entity is its name, type, and active observation texts.
//! Matches are ranked by the mean decay score of their active observations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::decay;
use super::entities::{entity_view, EntityView};
use super::types::{Entity, GraphDocument};
use crate::error::GraphError;

/// An entity view with its ranking score at the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: f64,
    #[serde(flatten)]
    pub entity: EntityView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

pub fn search(
    document: &GraphDocument,
    query: &str,
    now: DateTime<Utc>,
) -> Result<SearchResponse, GraphError> {
    if query.trim().is_empty() {
        return Err(GraphError::invalid("missing required field: query"));
    }
    let needle = query.to_lowercase();

    let mut ranked: Vec<(f64, SearchHit)> = document
        .entities
        .iter()
        .filter(|entity| haystack(entity, now).contains(&needle))
        .map(|entity| {
            let scores: Vec<f64> = entity
                .observations
                .iter()
                .filter(|o| !o.is_expired(now))
                .map(|o| decay::score(o, now))
                .collect();
            let score = decay::mean(&scores);
            let hit = SearchHit {
                score: decay::round_score(score),
                entity: entity_view(document, entity, false, now),
            };
            (score, hit)
        })
        .collect();

    // Stable: equal scores keep document order.
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let results: Vec<SearchHit> = ranked.into_iter().map(|(_, hit)| hit).collect();
    Ok(SearchResponse {
        query: query.to_string(),
        count: results.len(),
        results,
    })
}

fn haystack(entity: &Entity, now: DateTime<Utc>) -> String {
    let mut text = format!("{} {}", entity.name, entity.entity_type);
    for observation in entity.observations.iter().filter(|o| !o.is_expired(now)) {
        text.push(' ');
        text.push_str(&observation.text);
    }
    text.to_lowercase()
}
