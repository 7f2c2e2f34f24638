use anyhow::Result;
use chrono::Utc;
use ebb::config::EbbConfig;

/// Run a substring search from the terminal.
pub fn search(config: &EbbConfig, query: &str) -> Result<()> {
    let document = super::load_document(config)?;
    let response = ebb::graph::search::search(&document, query, Utc::now())?;

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\"\n", response.count, response.query);

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (score: {:.3})",
            i + 1,
            hit.entity.entity_type,
            hit.entity.name,
            hit.score,
        );
        for observation in hit.entity.observations.iter().take(3) {
            let text = &observation.text;
            let preview = if text.chars().count() > 120 {
                format!("{}...", text.chars().take(120).collect::<String>())
            } else {
                text.clone()
            };
            println!("     - {} ({:.3})", preview, observation.score);
        }
        println!();
    }

    Ok(())
}
