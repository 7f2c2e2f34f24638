//! The knowledge graph core: types, decay scoring, operations, and the request
//! pipeline that composes them with rate limiting and persistence.

pub mod decay;
pub mod entities;
pub mod relations;
pub mod requests;
pub mod search;
pub mod service;
pub mod stats;
pub mod types;

pub use service::{GraphService, Metered, Quota};
