use anyhow::Result;
use ebb::config::EbbConfig;

/// Export the raw graph document, expired facts included, as JSON to stdout.
pub fn export(config: &EbbConfig) -> Result<()> {
    let document = super::load_document(config)?;

    let json = serde_json::to_string_pretty(&document)?;
    println!("{json}");

    eprintln!(
        "Exported {} entities and {} relations.",
        document.entities.len(),
        document.relations.len()
    );

    Ok(())
}
