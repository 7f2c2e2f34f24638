//! Offline terminal commands. They read the store directly and are not rate-limited.

pub mod export;
pub mod inspect;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use ebb::config::EbbConfig;
use ebb::graph::types::GraphDocument;
use ebb::store::{DocumentStore, KvDocumentStore};

/// Load the current graph document from the configured store.
fn load_document(config: &EbbConfig) -> Result<GraphDocument> {
    let kv = crate::server::open_kv(config)?;
    let documents = KvDocumentStore::new(
        kv,
        config.storage.document_key.clone(),
        config.storage.write_mode,
    );
    let (document, version) = documents
        .load()
        .context("failed to load graph document")?;
    tracing::debug!(version, entities = document.entities.len(), "graph document loaded");
    Ok(document)
}
