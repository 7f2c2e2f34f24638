pub mod get_entity;
pub mod graph_stats;
pub mod record_access;
pub mod search_graph;

use chrono::{DateTime, Utc};
use ebb::error::GraphError;
use ebb::graph::requests::{AddObservationRequest, CreateEntityRequest, CreateRelationRequest};
use ebb::graph::GraphService;
use get_entity::GetEntityParams;
use graph_stats::GraphStatsParams;
use record_access::RecordAccessParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_graph::SearchGraphParams;
use serde::Serialize;
use std::sync::Arc;

/// The ebb MCP tool handler. Every call is metered against a single configured
/// identity, since a stdio session has exactly one peer.
#[derive(Clone)]
pub struct EbbTools {
    tool_router: ToolRouter<Self>,
    service: Arc<GraphService>,
    identity: Arc<str>,
}

#[tool_router]
impl EbbTools {
    pub fn new(service: Arc<GraphService>, identity: impl Into<Arc<str>>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
            identity: identity.into(),
        }
    }

    #[tool(description = "Create a new entity with a unique name, a type tag, and optional initial observations (plain strings or {text, observed_at?, expires_at?}).")]
    async fn create_entity(
        &self,
        Parameters(params): Parameters<CreateEntityRequest>,
    ) -> Result<String, String> {
        tracing::debug!(name = ?params.name, "create_entity called");
        self.call(move |svc, caller, now| svc.create_entity(caller, params, now))
            .await
    }

    #[tool(description = "Append a timestamped observation to an existing entity. Pass expires_at for facts that go stale at a known time.")]
    async fn add_observation(
        &self,
        Parameters(params): Parameters<AddObservationRequest>,
    ) -> Result<String, String> {
        tracing::debug!(name = ?params.name, "add_observation called");
        self.call(move |svc, caller, now| svc.add_observation(caller, params, now))
            .await
    }

    #[tool(description = "Create a directed relation (source --[relation]--> target) between two existing entities.")]
    async fn create_relation(
        &self,
        Parameters(params): Parameters<CreateRelationRequest>,
    ) -> Result<String, String> {
        tracing::debug!(
            source = ?params.source,
            relation = ?params.relation,
            target = ?params.target,
            "create_relation called"
        );
        self.call(move |svc, caller, now| svc.create_relation(caller, params, now))
            .await
    }

    #[tool(description = "Fetch an entity with its decay-scored observations and its incoming and outgoing relations. Expired facts are hidden unless include_expired is true.")]
    async fn get_entity(
        &self,
        Parameters(params): Parameters<GetEntityParams>,
    ) -> Result<String, String> {
        tracing::debug!(name = %params.name, "get_entity called");
        let include_expired = params.include_expired.unwrap_or(false);
        self.call(move |svc, caller, now| {
            svc.get_entity(caller, &params.name, include_expired, now)
        })
        .await
    }

    #[tool(description = "Search entities by case-insensitive substring over names, types, and active observations. Results are ranked by average decay score.")]
    async fn search_graph(
        &self,
        Parameters(params): Parameters<SearchGraphParams>,
    ) -> Result<String, String> {
        tracing::debug!(query = ?params.query, "search_graph called");
        self.call(move |svc, caller, now| svc.search(caller, params.query.as_deref(), now))
            .await
    }

    #[tool(description = "Get graph statistics: entity, relation, and observation counts, average decay score, and entities per type.")]
    async fn graph_stats(
        &self,
        Parameters(_params): Parameters<GraphStatsParams>,
    ) -> Result<String, String> {
        self.call(|svc, caller, now| svc.stats(caller, now)).await
    }

    #[tool(description = "Record that an entity's facts were just used. Boosts the decay score of its active observations.")]
    async fn record_access(
        &self,
        Parameters(params): Parameters<RecordAccessParams>,
    ) -> Result<String, String> {
        tracing::debug!(name = %params.name, "record_access called");
        self.call(move |svc, caller, now| svc.record_access(caller, &params.name, now))
            .await
    }
}

impl EbbTools {
    /// Run a service call on the blocking pool and render the result as JSON.
    /// Failures carry the same `{error, kind, ...}` body the HTTP surface returns.
    async fn call<T, F>(&self, operation: F) -> Result<String, String>
    where
        T: Serialize + Send + 'static,
        F: FnOnce(&GraphService, &str, DateTime<Utc>) -> Result<T, GraphError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let identity = Arc::clone(&self.identity);
        let result = tokio::task::spawn_blocking(move || operation(&*service, &*identity, Utc::now()))
            .await
            .map_err(|e| format!("graph task failed: {e}"))?;

        match result {
            Ok(value) => {
                serde_json::to_string(&value).map_err(|e| format!("serialization failed: {e}"))
            }
            Err(err) => Err(serde_json::to_string(&err.to_body())
                .unwrap_or_else(|_| err.to_string())),
        }
    }
}

#[tool_handler]
impl ServerHandler for EbbTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "ebb is a fading knowledge graph. Use create_entity and add_observation to record \
                 facts, create_relation to link entities, and get_entity or search_graph to read \
                 them back ranked by relevance. Call record_access after relying on an entity."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
