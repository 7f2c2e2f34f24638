mod helpers;

use chrono::Duration;
use ebb::error::GraphError;
use ebb::graph::entities::Direction;
use ebb::store::KvStore;
use helpers::*;

#[test]
fn expired_observation_hidden_unless_requested() {
    let (service, _kv) = test_service();
    let now = ts("2026-05-01T09:00:00Z");

    service
        .create_entity(OWNER, entity("Aineko", "agent", &["Built OpenClaw"]), now)
        .unwrap();
    service
        .add_observation(
            OWNER,
            observation("Aineko", "Shipped v2", Some("2026-05-01T08:59:59Z")),
            now,
        )
        .unwrap();

    let view = service.get_entity(OWNER, "Aineko", false, now).unwrap().value;
    assert_eq!(view.observations.len(), 1);
    assert_eq!(view.observations[0].text, "Built OpenClaw");
    assert_eq!(view.observations[0].score, 1.0);

    let full = service.get_entity(OWNER, "Aineko", true, now).unwrap().value;
    assert_eq!(full.observations.len(), 2);
    assert!(full.observations[1].expired);
    assert_eq!(full.observations[1].text, "Shipped v2");
}

#[test]
fn duplicate_relation_is_a_conflict() {
    let (service, _kv) = test_service();
    let now = ts("2026-05-01T09:00:00Z");
    service.create_entity(OWNER, entity("Aineko", "agent", &[]), now).unwrap();
    service.create_entity(OWNER, entity("OpenClaw", "project", &[]), now).unwrap();

    let created = service
        .create_relation(OWNER, relation("Aineko", "built", "OpenClaw"), now)
        .unwrap();
    assert_eq!(created.value.created, "Aineko --[built]--> OpenClaw");

    let err = service
        .create_relation(OWNER, relation("Aineko", "built", "OpenClaw"), now)
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let stats = service.stats(OWNER, now).unwrap().value;
    assert_eq!(stats.relations, 1);
}

#[test]
fn relations_show_direction_from_each_end() {
    let (service, _kv) = test_service();
    let now = ts("2026-05-01T09:00:00Z");
    service.create_entity(OWNER, entity("Aineko", "agent", &[]), now).unwrap();
    service.create_entity(OWNER, entity("OpenClaw", "project", &[]), now).unwrap();
    service
        .create_relation(OWNER, relation("Aineko", "built", "OpenClaw"), now)
        .unwrap();

    let aineko = service.get_entity(OWNER, "Aineko", false, now).unwrap().value;
    assert_eq!(aineko.relations.len(), 1);
    assert_eq!(aineko.relations[0].direction, Direction::Outgoing);
    assert_eq!(aineko.relations[0].entity, "OpenClaw");

    let openclaw = service.get_entity(OWNER, "OpenClaw", false, now).unwrap().value;
    assert_eq!(openclaw.relations[0].direction, Direction::Incoming);
    assert_eq!(openclaw.relations[0].entity, "Aineko");
}

#[test]
fn relation_to_missing_entity_is_not_found() {
    let (service, _kv) = test_service();
    let now = ts("2026-05-01T09:00:00Z");
    service.create_entity(OWNER, entity("Aineko", "agent", &[]), now).unwrap();

    let err = service
        .create_relation(OWNER, relation("Aineko", "built", "Ghost"), now)
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn failed_mutation_never_writes() {
    let (service, kv) = test_service();
    let now = ts("2026-05-01T09:00:00Z");
    service.create_entity(OWNER, entity("Aineko", "agent", &[]), now).unwrap();
    let before = kv.get("graph").unwrap().unwrap();

    service
        .add_observation(OWNER, observation("Nobody", "lost", None), now)
        .unwrap_err();
    service
        .create_entity(OWNER, entity("Aineko", "agent", &[]), now)
        .unwrap_err();
    service
        .add_observation(OWNER, observation("Aineko", "bad expiry", Some("someday")), now)
        .unwrap_err();

    let after = kv.get("graph").unwrap().unwrap();
    assert_eq!(before, after);
}

#[test]
fn reads_do_not_write_and_are_repeatable() {
    let (service, kv) = test_service();
    let now = ts("2026-05-01T09:00:00Z");
    service
        .create_entity(OWNER, entity("Aineko", "agent", &["Built OpenClaw"]), now)
        .unwrap();
    let version = kv.get("graph").unwrap().unwrap().version;

    let later = now + Duration::days(10);
    let first = service.get_entity(OWNER, "Aineko", false, later).unwrap();
    let second = service.get_entity(OWNER, "Aineko", false, later).unwrap();
    assert_eq!(first, second);
    service.search(OWNER, Some("aineko"), later).unwrap();
    service.stats(OWNER, later).unwrap();

    assert_eq!(kv.get("graph").unwrap().unwrap().version, version);

    let much_later = now + Duration::days(40);
    let faded = service.get_entity(OWNER, "Aineko", false, much_later).unwrap();
    assert!(faded.value.observations[0].score < first.value.observations[0].score);
}

#[test]
fn record_access_boosts_active_observations() {
    let (service, _kv) = test_service();
    let start = ts("2026-05-01T09:00:00Z");
    service
        .create_entity(OWNER, entity("Aineko", "agent", &["Built OpenClaw"]), start)
        .unwrap();
    service
        .add_observation(
            OWNER,
            observation("Aineko", "Shipped v2", Some("2026-05-02T00:00:00Z")),
            start,
        )
        .unwrap();

    let now = start + Duration::days(30);
    let before = service.get_entity(OWNER, "Aineko", false, now).unwrap().value;
    assert_eq!(before.observations[0].score, 0.5);

    let touched = service.record_access(OWNER, "Aineko", now).unwrap().value;
    assert_eq!(touched.observations, 1);

    let after = service.get_entity(OWNER, "Aineko", true, now).unwrap().value;
    assert_eq!(after.observations[0].access_count, 1);
    assert_eq!(after.observations[0].score, 0.825);
    assert_eq!(after.observations[1].access_count, 0);
}

#[test]
fn search_ranks_by_mean_score() {
    let (service, _kv) = test_service();
    let start = ts("2026-05-01T09:00:00Z");
    service
        .create_entity(OWNER, entity("OldClaw", "project", &["claw prototype"]), start)
        .unwrap();
    let now = start + Duration::days(30);
    service
        .create_entity(OWNER, entity("NewClaw", "project", &["claw rewrite"]), now)
        .unwrap();
    service.create_entity(OWNER, entity("Bare", "claw", &[]), now).unwrap();

    let response = service.search(OWNER, Some("CLAW"), now).unwrap().value;
    let names: Vec<&str> = response.results.iter().map(|r| r.entity.name.as_str()).collect();
    assert_eq!(names, ["NewClaw", "OldClaw", "Bare"]);
    assert_eq!(response.results[1].score, 0.5);
    assert_eq!(response.results[2].score, 0.0);

    let err = service.search(OWNER, None, now).unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
}
