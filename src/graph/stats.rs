use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::decay;
use super::types::GraphDocument;

/// Response from graph stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    pub entities: usize,
    /// Active (non-expired) relations.
    pub relations: usize,
    pub observations: ObservationCounts,
    pub decay: DecaySummary,
    /// Entity count per `entityType`.
    pub types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationCounts {
    pub active: usize,
    pub expired: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecaySummary {
    pub avg_score: f64,
    pub half_life_days: f64,
}

/// Aggregate counts and the mean decay score across all active observations.
pub fn graph_stats(document: &GraphDocument, now: DateTime<Utc>) -> StatsResponse {
    let mut types = BTreeMap::new();
    let mut scores = Vec::new();
    let mut expired = 0;

    for entity in &document.entities {
        *types.entry(entity.entity_type.clone()).or_insert(0) += 1;
        for observation in &entity.observations {
            if observation.is_expired(now) {
                expired += 1;
            } else {
                scores.push(decay::score(observation, now));
            }
        }
    }

    StatsResponse {
        entities: document.entities.len(),
        relations: document
            .relations
            .iter()
            .filter(|r| !r.is_expired(now))
            .count(),
        observations: ObservationCounts {
            active: scores.len(),
            expired,
        },
        decay: DecaySummary {
            avg_score: decay::round_score(decay::mean(&scores)),
            half_life_days: decay::HALF_LIFE_DAYS,
        },
        types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{Entity, Observation, Relation};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entity(name: &str, entity_type: &str, observations: Vec<Observation>) -> Entity {
        Entity {
            name: name.into(),
            entity_type: entity_type.into(),
            observations,
            created: now(),
            updated: now(),
        }
    }

    #[test]
    fn test_empty_graph_stats() {
        let stats = graph_stats(&GraphDocument::default(), now());
        assert_eq!(stats.entities, 0);
        assert_eq!(stats.relations, 0);
        assert_eq!(stats.observations.active, 0);
        assert_eq!(stats.observations.expired, 0);
        assert_eq!(stats.decay.avg_score, 0.0);
        assert_eq!(stats.decay.half_life_days, 30.0);
        assert!(stats.types.is_empty());
    }

    #[test]
    fn test_stats_counts() {
        let mut stale = Observation::new("old news", now());
        stale.expires_at = Some(now() - Duration::hours(1));

        let doc = GraphDocument {
            entities: vec![
                entity("Aineko", "agent", vec![Observation::new("fresh", now()), stale]),
                entity(
                    "OpenClaw",
                    "project",
                    vec![Observation::new("half", now() - Duration::days(30))],
                ),
                entity("Claw2", "project", vec![]),
            ],
            relations: vec![
                Relation {
                    source: "Aineko".into(),
                    relation: "built".into(),
                    target: "OpenClaw".into(),
                    created: now(),
                    expires_at: None,
                },
                Relation {
                    source: "Aineko".into(),
                    relation: "built".into(),
                    target: "Claw2".into(),
                    created: now(),
                    expires_at: Some(now()),
                },
            ],
        };

        let stats = graph_stats(&doc, now());
        assert_eq!(stats.entities, 3);
        assert_eq!(stats.relations, 1);
        assert_eq!(stats.observations.active, 2);
        assert_eq!(stats.observations.expired, 1);
        assert_eq!(stats.decay.avg_score, 0.75);
        assert_eq!(stats.types["project"], 2);
        assert_eq!(stats.types["agent"], 1);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["decay"]["half_life_days"], 30.0);
        assert_eq!(json["observations"]["expired"], 1);
    }
}
