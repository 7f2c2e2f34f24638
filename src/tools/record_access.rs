use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordAccessParams {
    #[schemars(description = "Entity whose active observations were just used")]
    pub name: String,
}
