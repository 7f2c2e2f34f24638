//! CLI `inspect` command: display one entity with scored observations and relations.

use anyhow::Result;
use chrono::Utc;
use ebb::config::EbbConfig;
use ebb::graph::entities::{view_entity, Direction};

pub fn inspect(config: &EbbConfig, name: &str, include_expired: bool) -> Result<()> {
    let document = super::load_document(config)?;
    let view = view_entity(&document, name, include_expired, Utc::now())?;

    println!("Entity: {}", view.name);
    println!("{}", "=".repeat(50));
    println!("  Type:           {}", view.entity_type);
    println!("  Created:        {}", view.created);
    println!("  Updated:        {}", view.updated);
    println!();

    println!("Observations:");
    if view.observations.is_empty() {
        println!("  (none)");
    }
    for observation in &view.observations {
        let marker = if observation.expired { " [expired]" } else { "" };
        println!("  {:.3}  {}{}", observation.score, observation.text, marker);
        if observation.access_count > 0 {
            println!("         accessed {} time(s)", observation.access_count);
        }
        if let Some(ref expires_at) = observation.expires_at {
            println!("         expires {expires_at}");
        }
    }

    if !view.relations.is_empty() {
        println!();
        println!("Relations:");
        for relation in &view.relations {
            let marker = if relation.expired { " [expired]" } else { "" };
            match relation.direction {
                Direction::Outgoing => println!(
                    "  --[{}]--> {}{}",
                    relation.relation, relation.entity, marker
                ),
                Direction::Incoming => println!(
                    "  <--[{}]-- {}{}",
                    relation.relation, relation.entity, marker
                ),
            }
        }
    }

    Ok(())
}
