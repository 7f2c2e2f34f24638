use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchGraphParams {
    #[schemars(description = "Case-insensitive substring matched against names, types, and active observations")]
    pub query: Option<String>,
}
