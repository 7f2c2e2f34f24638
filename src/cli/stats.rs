use anyhow::Result;
use chrono::Utc;
use ebb::config::EbbConfig;
use ebb::graph::stats::graph_stats;

/// Display graph statistics in the terminal.
pub fn stats(config: &EbbConfig) -> Result<()> {
    let document = super::load_document(config)?;
    let response = graph_stats(&document, Utc::now());

    println!("Graph Statistics");
    println!("{}", "=".repeat(40));
    println!("  Entities:            {}", response.entities);
    println!("  Active relations:    {}", response.relations);
    println!("  Active observations: {}", response.observations.active);
    println!("  Expired observations: {}", response.observations.expired);
    println!();

    println!("Decay:");
    println!("  Average score:       {:.3}", response.decay.avg_score);
    println!("  Half-life:           {} days", response.decay.half_life_days);
    println!();

    if !response.types.is_empty() {
        println!("By Type:");
        for (entity_type, count) in &response.types {
            println!("  {:<16} {}", entity_type, count);
        }
    }

    Ok(())
}
