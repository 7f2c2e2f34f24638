//! Fading knowledge graph: entities, timestamped observations, and directed relations
//! whose relevance decays over time unless reinforced by access or recency.
//!
//! The whole graph lives in one document inside a key-value store. Every request
//! loads the document, applies one pure in-memory operation, and (for mutations)
//! writes the whole document back. Mutating and read-counted requests first pass a
//! fixed-window rate limiter keyed by caller identity and operation class.
//!
//! # Scoring
//!
//! | Term | Value |
//! |------|-------|
//! | Half-life | 30 days |
//! | Access boost | +0.1 per recorded access, unbounded |
//! | Recency boost | up to ×1.5, fading linearly over 7 days since last access |
//! | Floor | 0.01 |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`error`]: Error taxonomy shared by every surface
//! - [`graph`]: Types, decay engine, operations, search, stats, and the request pipeline
//! - [`ratelimit`]: Fixed-window quotas per caller and operation class
//! - [`store`]: Key-value adapters (SQLite, in-memory) and the graph document slot

pub mod config;
pub mod error;
pub mod graph;
pub mod ratelimit;
pub mod store;
