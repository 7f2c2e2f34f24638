//! MCP `get_entity` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetEntityParams {
    #[schemars(description = "Exact, case-sensitive entity name")]
    pub name: String,

    #[schemars(description = "If true, also list expired observations and relations, flagged as expired")]
    pub include_expired: Option<bool>,
}
